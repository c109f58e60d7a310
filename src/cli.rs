//! Command-line interface parsing for the MGNREGA comparison service
//!
//! This module handles parsing of CLI arguments using clap. Every `serve`
//! option can also be supplied through an `MGNREGA_*` environment variable,
//! and is validated into a [`ServiceConfig`] before the server starts.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use thiserror::Error;

use crate::data::source::{DEFAULT_BASE_URL, DEFAULT_RECORD_LIMIT};

/// Default port the service listens on
pub const DEFAULT_PORT: u16 = 6001;

/// Default server URL used by the `compare` command
pub const DEFAULT_SERVER_URL: &str = "http://localhost:6001";

/// Error types for configuration validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The upstream API key is empty
    #[error("Missing API key: pass --api-key or set MGNREGA_API_KEY")]
    MissingApiKey,

    /// The base URL does not parse or is not http(s)
    #[error("Invalid base URL '{0}': expected an http:// or https:// URL")]
    InvalidBaseUrl(String),

    /// The bind address does not parse
    #[error("Invalid host '{0}'")]
    InvalidHost(String),

    /// The record limit is zero
    #[error("Invalid record limit: must be greater than zero")]
    InvalidRecordLimit,
}

/// MGNREGA district comparison service
#[derive(Parser, Debug)]
#[command(name = "mgnrega-dash")]
#[command(about = "Compare MGNREGA district statistics from data.gov.in")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Compare two districts using a running service
    ///
    /// Examples:
    ///   mgnrega-dash compare PUNE NASHIK
    ///   mgnrega-dash compare Pune Akola --server http://10.0.0.5:6001
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// data.gov.in API key
    #[arg(long, env = "MGNREGA_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Resource URL of the upstream dataset
    #[arg(long, env = "MGNREGA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// IP address to bind
    #[arg(long, env = "MGNREGA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "MGNREGA_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// How long a computed summary stays fresh, in seconds
    #[arg(long, env = "MGNREGA_CACHE_TTL_SECS", default_value_t = 600)]
    pub cache_ttl_secs: u64,

    /// Number of records requested from the upstream per fetch
    #[arg(long, env = "MGNREGA_RECORD_LIMIT", default_value_t = DEFAULT_RECORD_LIMIT)]
    pub record_limit: usize,

    /// Abort upstream requests after this many seconds (no limit by default)
    #[arg(long, env = "MGNREGA_UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// First district
    pub district_a: String,

    /// Second district
    pub district_b: String,

    /// Base URL of a running service
    #[arg(long, env = "MGNREGA_SERVER", default_value = DEFAULT_SERVER_URL)]
    pub server: String,
}

/// Validated configuration for the HTTP service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub api_key: String,
    pub base_url: String,
    pub bind_addr: SocketAddr,
    pub cache_ttl: Duration,
    pub record_limit: usize,
    pub upstream_timeout: Option<Duration>,
}

impl ServiceConfig {
    /// Validates `serve` arguments into a ServiceConfig.
    ///
    /// # Returns
    /// * `Ok(ServiceConfig)` with durations and the bind address resolved
    /// * `Err(ConfigError)` for an empty key, a bad URL or host, or a zero limit
    pub fn from_args(args: &ServeArgs) -> Result<Self, ConfigError> {
        let api_key = args.api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        match Url::parse(&args.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => return Err(ConfigError::InvalidBaseUrl(args.base_url.clone())),
        }

        if args.record_limit == 0 {
            return Err(ConfigError::InvalidRecordLimit);
        }

        let bind_addr = format!("{}:{}", args.host, args.port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidHost(args.host.clone()))?;

        Ok(ServiceConfig {
            api_key: api_key.to_string(),
            base_url: args.base_url.clone(),
            bind_addr,
            cache_ttl: Duration::from_secs(args.cache_ttl_secs),
            record_limit: args.record_limit,
            upstream_timeout: args.upstream_timeout_secs.map(Duration::from_secs),
        })
    }
}
