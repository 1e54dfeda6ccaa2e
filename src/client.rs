//! proxycheck.io query client.

use crate::cache::CacheProvider;
use crate::error::ProxyCheckError;
use crate::options::RequestOptions;
use crate::result::{IpResult, QueryResult, Status, CACHE_NODE};
use crate::transport::Transport;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

const PROXYCHECK_URL: &str = "proxycheck.io/v2";

/// Client for the proxycheck.io v2 API.
///
/// Holds an API key, the option set applied to every query, an injected
/// [`Transport`] and an optional [`CacheProvider`]. The client never builds
/// its own transport; connection lifecycle, TLS and retry policy belong to
/// the injected capability.
pub struct ProxyCheckClient {
    api_key: String,
    options: RequestOptions,
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn CacheProvider>>,
}

impl ProxyCheckClient {
    /// Create a client over the given transport, with no API key, default
    /// options and no cache.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            api_key: String::new(),
            options: RequestOptions::default(),
            transport,
            cache: None,
        }
    }

    /// Set the API key sent with every query.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set the option set applied to every query.
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a cache provider.
    pub fn with_cache(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// The option set applied to every query.
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Check a single address given as a string literal.
    pub async fn query_str(&self, address: &str) -> Result<QueryResult, ProxyCheckError> {
        let ip = parse_address(address)?;
        self.query(&[ip], None).await
    }

    /// Check a single address.
    pub async fn query_addr(&self, address: IpAddr) -> Result<QueryResult, ProxyCheckError> {
        self.query(&[address], None).await
    }

    /// Check a batch of addresses given as string literals.
    ///
    /// Every literal is validated up front; the first malformed one fails
    /// the whole call with [`ProxyCheckError::InvalidAddress`].
    pub async fn query_strs<S: AsRef<str>>(
        &self,
        addresses: &[S],
        tag: Option<&str>,
    ) -> Result<QueryResult, ProxyCheckError> {
        let mut ips = Vec::with_capacity(addresses.len());
        for literal in addresses {
            ips.push(parse_address(literal.as_ref())?);
        }
        self.query(&ips, tag).await
    }

    /// Check a batch of addresses, reconciling cache hits with a live query.
    ///
    /// At most one network call is made per invocation; if every address is
    /// satisfied by the cache provider, none is. An address present in both
    /// the cache and the live response resolves to the live entry, since a
    /// fresh lookup is strictly more authoritative than a cached one.
    pub async fn query(
        &self,
        addresses: &[IpAddr],
        tag: Option<&str>,
    ) -> Result<QueryResult, ProxyCheckError> {
        if addresses.is_empty() {
            return Err(ProxyCheckError::InvalidAddress(
                "at least one IP address is required".to_string(),
            ));
        }

        let started = Instant::now();

        let requested: HashSet<IpAddr> = addresses.iter().copied().collect();
        let mut cache_hits: HashMap<IpAddr, IpResult> = HashMap::new();
        let mut remaining: Vec<IpAddr> = Vec::with_capacity(addresses.len());

        if let Some(ref cache) = self.cache {
            cache_hits = cache.get_cache_records(addresses, &self.options).await;

            // A provider returning addresses outside the request set is a
            // contract violation; drop such entries instead of propagating.
            let extraneous = cache_hits.len();
            cache_hits.retain(|ip, _| requested.contains(ip));
            if cache_hits.len() < extraneous {
                warn!(
                    dropped = extraneous - cache_hits.len(),
                    "cache provider returned addresses outside the request set"
                );
            }

            for hit in cache_hits.values_mut() {
                hit.is_cache_hit = true;
            }
        }

        let mut seen = HashSet::new();
        for ip in addresses {
            if !cache_hits.contains_key(ip) && seen.insert(*ip) {
                remaining.push(*ip);
            }
        }

        if remaining.is_empty() {
            debug!(hits = cache_hits.len(), "query answered entirely from cache");
            return Ok(QueryResult {
                status: Status::Ok,
                node: self.options.include_node.then(|| CACHE_NODE.to_string()),
                query_time: Some(started.elapsed()),
                results: cache_hits,
                extension_data: Default::default(),
            });
        }

        debug!(
            live = remaining.len(),
            cached = cache_hits.len(),
            "querying proxycheck.io"
        );

        let url = self.build_url();
        let form = build_form(&remaining, tag);

        let body = self.transport.post(&url, &form).await?;
        let mut result = QueryResult::from_slice(&body)?;

        // Offer the fresh results for storage; write failures are the
        // provider's concern.
        if let Some(ref cache) = self.cache {
            cache.set_cache_record(&result.results, &self.options).await;
        }

        for (ip, hit) in cache_hits {
            result.results.entry(ip).or_insert(hit);
        }

        Ok(result)
    }

    fn build_url(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();
        if !self.api_key.trim().is_empty() {
            params.push(("key", self.api_key.clone()));
        }
        params.extend(self.options.query_params());

        let query = params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}://{}/?{}", self.options.scheme(), PROXYCHECK_URL, query)
    }
}

fn parse_address(literal: &str) -> Result<IpAddr, ProxyCheckError> {
    literal.parse().map_err(|_| {
        ProxyCheckError::InvalidAddress(format!("`{}` is not a valid IP address", literal))
    })
}

fn build_form(addresses: &[IpAddr], tag: Option<&str>) -> Vec<(String, String)> {
    let ips = addresses
        .iter()
        .map(|ip| ip.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let mut form = vec![("ips".to_string(), ips)];
    if let Some(tag) = tag.filter(|t| !t.trim().is_empty()) {
        form.push(("tag".to_string(), tag.to_string()));
    }
    form
}
