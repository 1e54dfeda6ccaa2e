//! Query options for proxycheck.io lookups.

use serde::{Deserialize, Serialize};

/// Options controlling what a query asks the server for.
///
/// A full option set is part of the cache identity of a result: cache
/// providers receive the options alongside the addresses and may namespace
/// their entries by them, which is why this derives `Hash` and `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct RequestOptions {
    /// Query the API over HTTPS instead of HTTP.
    #[serde(default)]
    pub use_tls: bool,

    /// Include VPN detection.
    #[serde(default)]
    pub include_vpn: bool,

    /// Include the ASN of the network the address belongs to.
    #[serde(default)]
    pub include_asn: bool,

    /// Include the answering node in the reply.
    #[serde(default)]
    pub include_node: bool,

    /// Include the server-side query time in the reply.
    #[serde(default)]
    pub include_time: bool,

    /// Use the real-time inference engine.
    #[serde(default = "default_true")]
    pub use_inference: bool,

    /// Include the port the address was last seen operating a proxy on.
    #[serde(default)]
    pub include_port: bool,

    /// Include the last time the address was seen acting as a proxy.
    #[serde(default)]
    pub include_last_seen: bool,

    /// Restrict proxy results to the last N days.
    #[serde(default = "default_day_limit")]
    pub day_limit: u32,

    /// Risk scoring level.
    #[serde(default)]
    pub risk_level: RiskLevel,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            use_tls: false,
            include_vpn: false,
            include_asn: false,
            include_node: false,
            include_time: false,
            use_inference: true,
            include_port: false,
            include_last_seen: false,
            day_limit: default_day_limit(),
            risk_level: RiskLevel::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_day_limit() -> u32 {
    7
}

impl RequestOptions {
    /// URL scheme implied by the TLS toggle.
    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    /// Serialize the options as query-string parameters, booleans as `0`/`1`.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        fn flag(value: bool) -> String {
            (value as u8).to_string()
        }

        vec![
            ("vpn", flag(self.include_vpn)),
            ("asn", flag(self.include_asn)),
            ("node", flag(self.include_node)),
            ("time", flag(self.include_time)),
            ("inf", flag(self.use_inference)),
            ("port", flag(self.include_port)),
            ("seen", flag(self.include_last_seen)),
            ("days", self.day_limit.to_string()),
            ("risk", (self.risk_level as u8).to_string()),
        ]
    }
}

/// Risk scoring level for a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RiskLevel {
    /// No risk score in the response.
    #[default]
    Disabled = 0,
    /// Include a risk score with each result.
    Score = 1,
    /// Include a risk score and attack history.
    ScoreAndHistory = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = RequestOptions::default();
        assert!(!options.use_tls);
        assert!(options.use_inference);
        assert_eq!(options.day_limit, 7);
        assert_eq!(options.risk_level, RiskLevel::Disabled);
    }

    #[test]
    fn test_query_params_defaults() {
        let params = RequestOptions::default().query_params();
        let get = |name: &str| {
            params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };

        assert_eq!(get("vpn"), "0");
        assert_eq!(get("inf"), "1");
        assert_eq!(get("days"), "7");
        assert_eq!(get("risk"), "0");
    }

    #[test]
    fn test_query_params_booleans_as_integers() {
        let options = RequestOptions {
            include_vpn: true,
            include_asn: true,
            risk_level: RiskLevel::ScoreAndHistory,
            day_limit: 30,
            ..Default::default()
        };
        let params = options.query_params();

        assert!(params.contains(&("vpn", "1".to_string())));
        assert!(params.contains(&("asn", "1".to_string())));
        assert!(params.contains(&("days", "30".to_string())));
        assert!(params.contains(&("risk", "2".to_string())));
    }

    #[test]
    fn test_scheme() {
        assert_eq!(RequestOptions::default().scheme(), "http");
        let options = RequestOptions {
            use_tls: true,
            ..Default::default()
        };
        assert_eq!(options.scheme(), "https");
    }

    #[test]
    fn test_options_are_hashable_cache_keys() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(RequestOptions::default());
        set.insert(RequestOptions {
            include_vpn: true,
            ..Default::default()
        });
        set.insert(RequestOptions::default());

        assert_eq!(set.len(), 2);
    }
}
