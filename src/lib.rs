//! Async client for the proxycheck.io v2 proxy-detection and IP-reputation
//! API.
//!
//! Looks up one or more IP addresses in a single batched request and returns
//! structured per-address results: proxy/VPN detection, proxy type, ASN and
//! geolocation, risk score, and last-seen data.
//!
//! # Features
//!
//! - **Batch Queries** - Any number of addresses in one request
//! - **Pluggable Transport** - Bring your own HTTP stack, or use the bundled
//!   reqwest-based [`HttpTransport`]
//! - **Pluggable Caching** - Inject a [`CacheProvider`]; cached addresses
//!   never hit the network, and an all-cache-hits query makes no request at
//!   all
//! - **Forward-Compatible Decoding** - Response keys the model does not
//!   recognize are preserved verbatim as extension data
//!
//! # Example
//!
//! ```no_run
//! use proxycheck_client::{HttpTransport, ProxyCheckClient, RequestOptions};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), proxycheck_client::ProxyCheckError> {
//! let client = ProxyCheckClient::new(Arc::new(HttpTransport::default()))
//!     .with_api_key("my-api-key")
//!     .with_options(RequestOptions {
//!         use_tls: true,
//!         include_vpn: true,
//!         ..Default::default()
//!     });
//!
//! let result = client.query_str("104.16.255.200").await?;
//! for (ip, entry) in &result.results {
//!     println!("{ip}: proxy={}", entry.is_proxy);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod options;
pub mod result;
pub mod transport;

pub use cache::{CacheProvider, MemoryCacheProvider};
pub use client::ProxyCheckClient;
pub use config::Config;
pub use error::{ProxyCheckError, TransportError};
pub use options::{RequestOptions, RiskLevel};
pub use result::{IpResult, QueryResult, Status, CACHE_NODE};
pub use transport::{HttpTransport, Transport};
