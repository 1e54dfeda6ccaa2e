//! Response envelope for proxycheck.io queries.
//!
//! The v2 API answers with a single flat JSON object that mixes typed
//! metadata keys (`status`, `node`, `query time`) with an open-ended set of
//! keys that are either IP address literals (value = a per-address result
//! object) or arbitrary extension keys (value = opaque JSON). Decoding is an
//! explicit two-pass classifier over the raw object: every key is routed to
//! exactly one of the typed fields, [`QueryResult::results`] or
//! [`QueryResult::extension_data`], never both and never dropped.

use crate::error::ProxyCheckError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::warn;

/// Server-reported outcome of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Ok,
    Warning,
    Denied,
    Error,
}

/// Decoded response for one or more queried addresses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// API status result.
    pub status: Status,
    /// Answering node, or [`CACHE_NODE`] when served entirely from cache.
    pub node: Option<String>,
    /// Elapsed query time, server-side for live responses and wall time for
    /// the all-cache-hits short circuit.
    pub query_time: Option<Duration>,
    /// Per-address results.
    pub results: HashMap<IpAddr, IpResult>,
    /// Top-level keys that are neither recognized metadata nor IP address
    /// literals, preserved verbatim for forward compatibility.
    pub extension_data: Map<String, Value>,
}

/// Node name reported when a query was answered entirely from cache.
pub const CACHE_NODE: &str = "CACHE";

impl QueryResult {
    /// Decode a response body.
    ///
    /// A body that is not valid JSON, is `null`, or is not an object is a
    /// `Lookup` error; an IP-keyed value that does not fit [`IpResult`] is a
    /// `Deserialization` error naming the offending key.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProxyCheckError> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| ProxyCheckError::lookup_with("bad JSON from server", e))?;
        Self::from_value(value)
    }

    /// Decode an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, ProxyCheckError> {
        match value {
            Value::Null => Err(ProxyCheckError::lookup("no result from server")),
            Value::Object(map) => Self::from_map(map),
            other => Err(ProxyCheckError::lookup(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, ProxyCheckError> {
        let mut result = QueryResult::default();

        for (key, value) in map {
            if key == "status" {
                result.status =
                    serde_json::from_value(value).map_err(|source| bad_key(&key, source))?;
            } else if key == "node" {
                result.node =
                    serde_json::from_value(value).map_err(|source| bad_key(&key, source))?;
            } else if key == "query time" {
                result.query_time = parse_query_time(&value);
            } else if let Ok(ip) = key.parse::<IpAddr>() {
                let ip_result: IpResult =
                    serde_json::from_value(value).map_err(|source| bad_key(&key, source))?;
                result.results.insert(ip, ip_result);
            } else {
                result.extension_data.insert(key, value);
            }
        }

        Ok(result)
    }

    /// Encode back into the wire object.
    ///
    /// Results and extension entries share one flat key space; the two are
    /// disjoint by construction, but should external mutation ever introduce
    /// a collision the extension entry wins, since that set is authoritative
    /// for non-identity keys.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();

        map.insert(
            "status".to_string(),
            serde_json::to_value(self.status).expect("Status serializes to JSON"),
        );
        if let Some(ref node) = self.node {
            map.insert("node".to_string(), Value::String(node.clone()));
        }
        if let Some(query_time) = self.query_time {
            map.insert(
                "query time".to_string(),
                Value::String(format!("{}s", query_time.as_secs_f64())),
            );
        }

        for (ip, ip_result) in &self.results {
            map.insert(
                ip.to_string(),
                serde_json::to_value(ip_result).expect("IpResult serializes to JSON"),
            );
        }

        for (key, value) in &self.extension_data {
            map.insert(key.clone(), value.clone());
        }

        Value::Object(map)
    }

    /// Encode into a JSON byte vector.
    pub fn to_vec(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_value()).expect("QueryResult serializes to JSON")
    }
}

fn bad_key(key: &str, source: serde_json::Error) -> ProxyCheckError {
    ProxyCheckError::Deserialization {
        key: key.to_string(),
        source,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse the service's `query time` value: a string of seconds with an
/// optional trailing `s` (`"0.014s"`), or a bare number. The format is not
/// documented, so an unrecognized value is logged and treated as absent
/// rather than failing the whole decode.
fn parse_query_time(value: &Value) -> Option<Duration> {
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('s').parse::<f64>().ok(),
        _ => None,
    };

    // try_from_secs_f64 rejects negative, non-finite and overflowing values
    match seconds.and_then(|secs| Duration::try_from_secs_f64(secs).ok()) {
        Some(duration) => Some(duration),
        None => {
            warn!(value = %value, "unparseable `query time` in response, ignoring");
            None
        }
    }
}

/// Per-address lookup result.
///
/// Geolocation fields are absent when the server omits them; the live API
/// also sends object fields this model does not carry (`range`,
/// `organisation`, `currency`, ...) which are ignored on decode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct IpResult {
    /// The ASN the address belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,

    /// The provider the address belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// The country the address is in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    /// ISO country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isocode: Option<String>,

    /// The city of the address. Approximate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Approximate latitude of the address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// Approximate longitude of the address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// Whether the address was detected as a proxy. Wire encoding is the
    /// literal string `"yes"` or `"no"`.
    #[serde(default, rename = "proxy", with = "yes_no")]
    pub is_proxy: bool,

    /// The type of proxy detected. Empty when none.
    #[serde(default, rename = "type")]
    pub proxy_type: String,

    /// The port the proxy server was last seen operating on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Risk score. Present only when risk scoring was requested and nonzero.
    #[serde(default, rename = "risk", skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<i64>,

    /// Last time the proxy server was seen, human readable.
    #[serde(
        default,
        rename = "last seen human",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_seen_human: Option<String>,

    /// Last time the proxy server was seen, Unix epoch seconds.
    #[serde(
        default,
        rename = "last seen unix",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_seen_unix: Option<i64>,

    /// Local annotation, never part of the wire format.
    #[serde(skip)]
    pub error_message: Option<String>,

    /// True if this result was served from a cache provider instead of the
    /// server. Set by the client, never part of the wire format.
    #[serde(skip)]
    pub is_cache_hit: bool,
}

impl IpResult {
    /// Last time the proxy server was seen, derived from
    /// [`last_seen_unix`](Self::last_seen_unix).
    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen_unix
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Codec for booleans the API spells as the strings `"yes"` and `"no"`.
mod yes_no {
    use serde::de::{Deserializer, Error, Unexpected};
    use serde::ser::Serializer;
    use serde::Deserialize;

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "yes" } else { "no" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.as_str() {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(D::Error::invalid_value(
                Unexpected::Str(other),
                &"\"yes\" or \"no\"",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_partitions_keys() {
        let body = json!({
            "status": "ok",
            "104.16.255.200": {
                "asn": "AS13335",
                "provider": "CLOUDFLARENET - Cloudflare, Inc., US",
                "country": "Canada",
                "isocode": "CA",
                "city": "Toronto",
                "latitude": 43.6532,
                "longitude": -79.3832,
                "proxy": "no",
                "type": "Business"
            },
            "foo": "bar"
        });

        let result = QueryResult::from_value(body).unwrap();
        assert_eq!(result.status, Status::Ok);
        assert_eq!(result.results.len(), 1);

        let ip: IpAddr = "104.16.255.200".parse().unwrap();
        let ip_result = &result.results[&ip];
        assert_eq!(ip_result.asn.as_deref(), Some("AS13335"));
        assert_eq!(ip_result.country.as_deref(), Some("Canada"));
        assert_eq!(ip_result.isocode.as_deref(), Some("CA"));
        assert_eq!(ip_result.city.as_deref(), Some("Toronto"));
        assert_eq!(ip_result.latitude, Some(43.6532));
        assert_eq!(ip_result.longitude, Some(-79.3832));
        assert!(!ip_result.is_proxy);
        assert_eq!(ip_result.proxy_type, "Business");

        assert_eq!(result.extension_data.len(), 1);
        assert_eq!(result.extension_data["foo"], json!("bar"));
    }

    #[test]
    fn test_decode_ipv6_key() {
        let body = json!({
            "status": "ok",
            "2606:4700::6810:ffc8": { "proxy": "yes", "type": "VPN" }
        });

        let result = QueryResult::from_value(body).unwrap();
        let ip: IpAddr = "2606:4700::6810:ffc8".parse().unwrap();
        assert!(result.results[&ip].is_proxy);
    }

    #[test]
    fn test_decode_ignores_unknown_result_fields() {
        let body = json!({
            "1.2.3.4": {
                "proxy": "no",
                "type": "Business",
                "range": "1.2.0.0/16",
                "currency": { "code": "CAD", "symbol": "CA$" }
            }
        });

        let result = QueryResult::from_value(body).unwrap();
        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        assert!(!result.results[&ip].is_proxy);
    }

    #[test]
    fn test_decode_missing_status_defaults_to_ok() {
        let result = QueryResult::from_value(json!({ "foo": "bar" })).unwrap();
        assert_eq!(result.status, Status::Ok);
        assert!(result.results.is_empty());
        assert_eq!(result.extension_data.len(), 1);
    }

    #[test]
    fn test_decode_bad_ip_value_names_key() {
        let body = json!({
            "status": "ok",
            "8.8.8.8": { "proxy": "maybe" }
        });

        let err = QueryResult::from_value(body).unwrap_err();
        match err {
            ProxyCheckError::Deserialization { key, .. } => assert_eq!(key, "8.8.8.8"),
            other => panic!("expected Deserialization error, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_null_and_non_object_bodies() {
        assert!(matches!(
            QueryResult::from_slice(b"null"),
            Err(ProxyCheckError::Lookup { .. })
        ));
        assert!(matches!(
            QueryResult::from_slice(b"[1,2]"),
            Err(ProxyCheckError::Lookup { .. })
        ));
        assert!(matches!(
            QueryResult::from_slice(b"{not json"),
            Err(ProxyCheckError::Lookup { .. })
        ));
    }

    #[test]
    fn test_yes_no_codec() {
        let yes: IpResult = serde_json::from_value(json!({ "proxy": "yes" })).unwrap();
        assert!(yes.is_proxy);

        let no: IpResult = serde_json::from_value(json!({ "proxy": "no" })).unwrap();
        assert!(!no.is_proxy);

        assert!(serde_json::from_value::<IpResult>(json!({ "proxy": "true" })).is_err());

        let encoded = serde_json::to_value(&yes).unwrap();
        assert_eq!(encoded["proxy"], json!("yes"));
        let encoded = serde_json::to_value(&no).unwrap();
        assert_eq!(encoded["proxy"], json!("no"));
    }

    #[test]
    fn test_query_time_formats() {
        let result = QueryResult::from_value(json!({ "query time": "0.014s" })).unwrap();
        assert_eq!(result.query_time, Some(Duration::from_secs_f64(0.014)));

        let result = QueryResult::from_value(json!({ "query time": 2 })).unwrap();
        assert_eq!(result.query_time, Some(Duration::from_secs(2)));

        let result = QueryResult::from_value(json!({ "query time": "soon" })).unwrap();
        assert_eq!(result.query_time, None);
    }

    #[test]
    fn test_query_time_out_of_range_values_are_ignored() {
        // Values a Duration cannot hold must fall back to absent, not panic
        for body in [
            json!({ "query time": 1e30 }),
            json!({ "query time": "1e300s" }),
            json!({ "query time": -1.5 }),
        ] {
            let result = QueryResult::from_value(body).unwrap();
            assert_eq!(result.query_time, None);
        }
    }

    #[test]
    fn test_round_trip() {
        let ip: IpAddr = "104.16.255.200".parse().unwrap();
        let mut original = QueryResult {
            status: Status::Warning,
            node: Some("answering-node".to_string()),
            query_time: Some(Duration::from_secs_f64(0.25)),
            ..Default::default()
        };
        original.results.insert(
            ip,
            IpResult {
                asn: Some("AS13335".to_string()),
                country: Some("Canada".to_string()),
                is_proxy: true,
                proxy_type: "VPN".to_string(),
                port: Some(8080),
                risk_score: Some(66),
                last_seen_unix: Some(1_700_000_000),
                ..Default::default()
            },
        );
        original
            .extension_data
            .insert("foo".to_string(), json!({"bar": [1, 2, 3]}));

        let decoded = QueryResult::from_slice(&original.to_vec()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_encode_extension_data_wins_collisions() {
        let ip: IpAddr = "1.1.1.1".parse().unwrap();
        let mut result = QueryResult::default();
        result.results.insert(ip, IpResult::default());
        result
            .extension_data
            .insert("1.1.1.1".to_string(), json!("overridden"));

        let encoded = result.to_value();
        assert_eq!(encoded["1.1.1.1"], json!("overridden"));
    }

    #[test]
    fn test_local_fields_never_hit_the_wire() {
        let ip_result = IpResult {
            is_cache_hit: true,
            error_message: Some("local note".to_string()),
            last_seen_unix: Some(1_700_000_000),
            ..Default::default()
        };

        let encoded = serde_json::to_value(&ip_result).unwrap();
        let object = encoded.as_object().unwrap();
        assert!(!object.contains_key("is_cache_hit"));
        assert!(!object.contains_key("error_message"));
        assert!(!object.contains_key("last_seen"));
    }

    #[test]
    fn test_last_seen_derived_from_unix() {
        let ip_result = IpResult {
            last_seen_unix: Some(0),
            ..Default::default()
        };
        assert_eq!(ip_result.last_seen().unwrap().timestamp(), 0);

        assert_eq!(IpResult::default().last_seen(), None);
    }

    #[test]
    fn test_status_wire_strings() {
        for (wire, status) in [
            ("ok", Status::Ok),
            ("warning", Status::Warning),
            ("denied", Status::Denied),
            ("error", Status::Error),
        ] {
            let decoded: Status = serde_json::from_value(json!(wire)).unwrap();
            assert_eq!(decoded, status);
        }

        let err = QueryResult::from_value(json!({ "status": "unknown" })).unwrap_err();
        assert!(matches!(err, ProxyCheckError::Deserialization { key, .. } if key == "status"));
    }
}
