//! Gateway settings loading from gateway.toml
//!
//! Every section and key is optional; missing values fall back to the defaults documented on
//! each field. A missing file is not an error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Configuration structure representing the entire gateway.toml file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Request status listing settings
    pub listing: ListingConfig,
    /// Trade request settings
    pub trade: TradeConfig,
}

/// Pagination limits for request status listings
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListingConfig {
    /// Page size when the caller gives none (default 100)
    pub default_limit: u64,
    /// Upper bound a caller-supplied page size is clamped to (default 100)
    pub max_limit: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 100,
        }
    }
}

/// Limits applied to trade request text fields
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TradeConfig {
    /// Maximum characters in a reject/cancel reply (default 100)
    pub reply_message_max_len: usize,
    /// Maximum characters in a request message (default 1000)
    pub message_max_len: usize,
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            reply_message_max_len: 100,
            message_max_len: 1000,
        }
    }
}

/// Loads gateway configuration from a TOML file
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed, or if
/// `default_limit` is zero or exceeds `max_limit`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GatewayConfig> {
    let path = path.as_ref();
    if !path.exists() {
        info!("No gateway config at {:?}, using defaults", path);
        return Ok(GatewayConfig::default());
    }

    debug!("Loading gateway config from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;
    parse_config(&contents)
}

/// Parses and checks gateway configuration text
pub fn parse_config(contents: &str) -> Result<GatewayConfig> {
    let config: GatewayConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse gateway.toml: {e}"),
    })?;

    if config.listing.default_limit == 0 || config.listing.default_limit > config.listing.max_limit
    {
        return Err(Error::Config {
            message: format!(
                "listing.default_limit must be within 1..={}",
                config.listing.max_limit
            ),
        });
    }

    Ok(config)
}

/// Loads gateway configuration from the default location (./gateway.toml)
pub fn load_default_config() -> Result<GatewayConfig> {
    load_config("gateway.toml")
}
