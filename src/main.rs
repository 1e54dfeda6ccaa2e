//! proxycheck.io lookup CLI.

use anyhow::Result;
use clap::Parser;
use proxycheck_client::{
    Config, HttpTransport, MemoryCacheProvider, ProxyCheckClient, QueryResult,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "proxycheck")]
#[command(about = "Look up proxy/VPN detection and risk data for IP addresses via proxycheck.io")]
#[command(version)]
struct Args {
    /// IP addresses to check
    #[arg(value_name = "IP")]
    addresses: Vec<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tag attached to the query, visible in the proxycheck.io dashboard
    #[arg(short, long)]
    tag: Option<String>,

    /// Print the raw JSON response instead of a summary
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "warn")]
    log_level: String,

    /// Print example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --print-config
    if args.print_config {
        println!("{}", Config::example());
        return Ok(());
    }

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = match args.config {
        Some(ref path) => {
            info!(config = %path.display(), "Loading configuration");
            Config::load(path)?
        }
        None => Config::default(),
    };

    // Handle --validate
    if args.validate {
        config.validate()?;
        info!("Configuration is valid");
        return Ok(());
    }

    if args.addresses.is_empty() {
        anyhow::bail!("at least one IP address is required");
    }

    let transport = Arc::new(HttpTransport::new(Duration::from_millis(config.timeout_ms)));
    let mut client = ProxyCheckClient::new(transport)
        .with_api_key(config.api_key.clone())
        .with_options(config.options.clone());

    if config.cache.enabled {
        client = client.with_cache(Arc::new(MemoryCacheProvider::new(
            config.cache.ttl_seconds,
            config.cache.max_entries,
        )));
    }

    let result = client
        .query_strs(&args.addresses, args.tag.as_deref())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result.to_value())?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &QueryResult) {
    if let Some(ref node) = result.node {
        println!("node: {}", node);
    }
    if let Some(query_time) = result.query_time {
        println!("query time: {:?}", query_time);
    }

    let mut addresses: Vec<_> = result.results.keys().collect();
    addresses.sort();

    for ip in addresses {
        let entry = &result.results[ip];
        let mut line = format!(
            "{}\tproxy={}",
            ip,
            if entry.is_proxy { "yes" } else { "no" }
        );

        if !entry.proxy_type.is_empty() {
            line.push_str(&format!(" type={}", entry.proxy_type));
        }
        if let Some(risk) = entry.risk_score {
            line.push_str(&format!(" risk={}", risk));
        }
        if let Some(ref country) = entry.country {
            line.push_str(&format!(" country={}", country));
        }
        if let Some(port) = entry.port {
            line.push_str(&format!(" port={}", port));
        }
        if let Some(last_seen) = entry.last_seen() {
            line.push_str(&format!(" last_seen={}", last_seen.to_rfc3339()));
        }
        if entry.is_cache_hit {
            line.push_str(" (cached)");
        }

        println!("{}", line);
    }
}
