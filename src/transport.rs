//! HTTP transport abstraction.
//!
//! The client never owns connection lifecycle concerns; it only needs a
//! capability that POSTs a URL plus form body and hands back the response
//! bytes. [`HttpTransport`] is the bundled reqwest-based implementation;
//! callers with their own pooling, retry, or TLS policy inject their own.

use crate::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Capability for issuing the outbound lookup request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `form` to `url` as `application/x-www-form-urlencoded` and
    /// return the raw response body.
    async fn post(&self, url: &str, form: &[(String, String)]) -> Result<Vec<u8>, TransportError>;
}

/// Default transport backed by a shared [`reqwest::Client`].
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the given request timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Wrap an existing client, keeping its pooling and timeout settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, url: &str, form: &[(String, String)]) -> Result<Vec<u8>, TransportError> {
        debug!(url = %url, "POSTing lookup request");

        let response = self.client.post(url).form(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}
