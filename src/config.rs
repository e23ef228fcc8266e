//! Client configuration loader - parses floodnet.toml
//!
//! Keeps policy values (API location, cache lifetime, maximum query window,
//! worker count, join policy) out of code. Every field has a default, so a
//! missing file or a partial file is fine:
//!
//! ```toml
//! [api]
//! base_url = "https://api.dev.floodlabs.nyc/api/rest/"
//! timeout_secs = 30
//!
//! [cache]
//! ttl_hours = 24
//!
//! [query]
//! max_window_days = 7
//! workers = 8
//! join = "left"      # or "inner"
//! ```
//!
//! `FLOODNET_API_BASE` (from the environment or `.env`) overrides
//! `api.base_url`.

use std::fs;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::Deserialize;

use crate::error::{FloodNetError, Result};
use crate::ingest::floodnet::DEFAULT_API_BASE;
use crate::query::JoinPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "floodnet.toml";
pub const API_BASE_ENV: &str = "FLOODNET_API_BASE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a deployment snapshot is served before refetching.
    pub ttl_hours: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_hours: 24 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Longest allowed depth query window. Was one day in earlier releases.
    pub max_window_days: i64,
    /// Concurrent per-deployment depth requests; 1 runs sequentially.
    pub workers: usize,
    pub join: JoinPolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_window_days: 7,
            workers: 8,
            join: JoinPolicy::Left,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FloodNetConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub query: QueryConfig,
}

impl FloodNetConfig {
    /// Saturates at `Duration::MAX`; `validate` rejects values that would.
    pub fn cache_ttl(&self) -> Duration {
        Duration::try_hours(self.cache.ttl_hours).unwrap_or(Duration::MAX)
    }

    pub fn max_window(&self) -> Duration {
        Duration::try_days(self.query.max_window_days).unwrap_or(Duration::MAX)
    }

    pub fn request_timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.api.timeout_secs)
    }

    /// Rejects values no query could run with.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(FloodNetError::Config("api.base_url must not be empty".to_string()));
        }
        if self.api.timeout_secs == 0 {
            return Err(FloodNetError::Config("api.timeout_secs must be positive".to_string()));
        }
        if self.cache.ttl_hours <= 0 {
            return Err(FloodNetError::Config("cache.ttl_hours must be positive".to_string()));
        }
        if Duration::try_hours(self.cache.ttl_hours).is_none() {
            return Err(FloodNetError::Config(format!(
                "cache.ttl_hours = {} is too large",
                self.cache.ttl_hours
            )));
        }
        if self.query.max_window_days <= 0 {
            return Err(FloodNetError::Config("query.max_window_days must be positive".to_string()));
        }
        if Duration::try_days(self.query.max_window_days).is_none() {
            return Err(FloodNetError::Config(format!(
                "query.max_window_days = {} is too large",
                self.query.max_window_days
            )));
        }
        if self.query.workers == 0 {
            return Err(FloodNetError::Config("query.workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<FloodNetConfig> {
    let config: FloodNetConfig = toml::from_str(contents)
        .map_err(|e| FloodNetError::Config(format!("invalid TOML: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration from a TOML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FloodNetConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| FloodNetError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    parse_config(&contents)
}

/// Loads `floodnet.toml` from the working directory if present (defaults
/// otherwise), then applies `.env` / environment overrides.
pub fn load_config_default() -> Result<FloodNetConfig> {
    dotenv::dotenv().ok();

    let mut config = if Path::new(DEFAULT_CONFIG_PATH).exists() {
        load_config(DEFAULT_CONFIG_PATH)?
    } else {
        FloodNetConfig::default()
    };

    if let Ok(base_url) = std::env::var(API_BASE_ENV) {
        config.api.base_url = base_url;
    }

    config.validate()?;
    Ok(config)
}
