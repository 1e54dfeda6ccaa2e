//! Error types for proxycheck.io lookups.

use std::error::Error as StdError;
use std::fmt;

/// Error from a proxycheck.io query.
#[derive(Debug)]
pub enum ProxyCheckError {
    /// A caller-supplied literal is not a valid IP address, or no
    /// addresses were supplied at all.
    InvalidAddress(String),
    /// A top-level response key was recognized (an IP address literal or a
    /// typed metadata key) but its value did not have the expected shape.
    Deserialization {
        /// The offending top-level key.
        key: String,
        source: serde_json::Error,
    },
    /// The lookup as a whole failed: transport error, absent or null
    /// response body, or a body that was not valid JSON.
    Lookup {
        message: String,
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl ProxyCheckError {
    pub(crate) fn lookup(message: impl Into<String>) -> Self {
        ProxyCheckError::Lookup {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn lookup_with(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        ProxyCheckError::Lookup {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for ProxyCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyCheckError::InvalidAddress(msg) => write!(f, "invalid address: {}", msg),
            ProxyCheckError::Deserialization { key, source } => {
                write!(f, "bad value for key `{}`: {}", key, source)
            }
            ProxyCheckError::Lookup { message, .. } => write!(f, "lookup failed: {}", message),
        }
    }
}

impl StdError for ProxyCheckError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ProxyCheckError::InvalidAddress(_) => None,
            ProxyCheckError::Deserialization { source, .. } => Some(source),
            ProxyCheckError::Lookup { source, .. } => {
                source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
            }
        }
    }
}

impl From<TransportError> for ProxyCheckError {
    fn from(e: TransportError) -> Self {
        ProxyCheckError::lookup_with("request failed", e)
    }
}

/// Error from the HTTP transport collaborator.
#[derive(Debug)]
pub enum TransportError {
    /// HTTP request failed.
    Http(reqwest::Error),
    /// Request timed out.
    Timeout,
    /// Server answered with a non-success status code.
    Status(u16),
    /// Other error.
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Http(e) => write!(f, "HTTP error: {}", e),
            TransportError::Timeout => write!(f, "request timed out"),
            TransportError::Status(code) => write!(f, "HTTP status {}", code),
            TransportError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TransportError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Http(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ProxyCheckError::InvalidAddress("`foo` is not a valid IP".to_string());
        assert!(err.to_string().contains("foo"));

        let err = ProxyCheckError::lookup("no result from server");
        assert_eq!(err.to_string(), "lookup failed: no result from server");

        let err = TransportError::Status(502);
        assert_eq!(err.to_string(), "HTTP status 502");
    }

    #[test]
    fn test_lookup_source_is_preserved() {
        let inner = TransportError::Timeout;
        let err: ProxyCheckError = inner.into();

        let source = err.source().expect("source should be set");
        assert_eq!(source.to_string(), "request timed out");
    }
}
