//! Configuration for the proxycheck CLI.

use crate::options::RequestOptions;
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// API key (supports ${ENV_VAR} syntax). Empty uses the free tier.
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Query options applied to every lookup.
    #[serde(default)]
    pub options: RequestOptions,

    /// Local result cache.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout_ms: default_timeout(),
            options: RequestOptions::default(),
            cache: CacheConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    5000
}

/// Local cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Enable the in-memory result cache.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Entry TTL in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// Maximum number of cached entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_max_entries() -> usize {
    10000
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than 0");
        }

        // The API accepts a day window between 1 and 60
        if self.options.day_limit == 0 || self.options.day_limit > 60 {
            anyhow::bail!(
                "options.day_limit ({}) must be between 1 and 60",
                self.options.day_limit
            );
        }

        if self.cache.enabled && self.cache.max_entries == 0 {
            anyhow::bail!("cache.max_entries must be greater than 0 when the cache is enabled");
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example() -> String {
        r#"# proxycheck.io client configuration

# API key; empty uses the unauthenticated free tier
api_key: "${PROXYCHECK_API_KEY}"

# Request timeout
timeout_ms: 5000

# Query options applied to every lookup
options:
  use_tls: true                # Query over HTTPS
  include_vpn: false           # VPN detection
  include_asn: false           # ASN of the owning network
  include_node: false          # Report the answering node
  include_time: false          # Report the server-side query time
  use_inference: true          # Real-time inference engine
  include_port: false          # Port the proxy was last seen on
  include_last_seen: false     # When the proxy was last seen
  day_limit: 7                 # Restrict results to the last N days (1-60)
  risk_level: disabled         # disabled, score, or scoreandhistory

# Local result cache
cache:
  enabled: true
  ttl_seconds: 3600            # Cache results for 1 hour
  max_entries: 10000
"#
        .to_string()
    }
}

/// Expand environment variables in the format ${VAR_NAME}.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let var_value = std::env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RiskLevel;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_key.is_empty());
        assert_eq!(config.timeout_ms, 5000);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.ttl_seconds, 3600);
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
api_key: "abc123"
timeout_ms: 2500

options:
  use_tls: true
  include_vpn: true
  day_limit: 30
  risk_level: score

cache:
  enabled: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.timeout_ms, 2500);
        assert!(config.options.use_tls);
        assert!(config.options.include_vpn);
        assert!(config.options.use_inference); // serde default
        assert_eq!(config.options.day_limit, 30);
        assert_eq!(config.options.risk_level, RiskLevel::Score);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.options.day_limit, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_day_limit() {
        let mut config: Config = serde_yaml::from_str("{}").unwrap();
        config.options.day_limit = 0;
        assert!(config.validate().is_err());

        config.options.day_limit = 61;
        assert!(config.validate().is_err());

        config.options.day_limit = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout() {
        let mut config: Config = serde_yaml::from_str("{}").unwrap();
        config.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_PROXYCHECK_KEY", "secret123");
        let input = "api_key: \"${TEST_PROXYCHECK_KEY}\"";
        let result = expand_env_vars(input);
        assert_eq!(result, "api_key: \"secret123\"");
        std::env::remove_var("TEST_PROXYCHECK_KEY");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let input = "api_key: \"${NONEXISTENT_VAR}\"";
        let result = expand_env_vars(input);
        assert_eq!(result, "api_key: \"\"");
    }

    #[test]
    fn test_example_config_parses_and_validates() {
        let config: Config = serde_yaml::from_str(&expand_env_vars(&Config::example())).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.options.use_tls);
    }
}
