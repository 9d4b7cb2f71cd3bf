//! Configuration management.
//!
//! Settings come from an optional JSON file plus environment overrides:
//!
//! 1. Explicit config file values (`NIFTY_SIGNALS_CONFIG` path, if set)
//! 2. Environment variables (NIFTY_* prefix)
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `NIFTY_HOST` → server.host
//! - `NIFTY_PORT` → server.port
//! - `NIFTY_CACHE_TTL_SECS` → cache.ttl_secs
//! - `NIFTY_UNIVERSE_LIMIT` → scan.universe_limit
//! - `NIFTY_LOG_LEVEL` → observability.log_level
//! - `NIFTY_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

use crate::engine::{EngineOptions, LevelPolicy};

/// Environment variable naming the config file path
pub const CONFIG_PATH_ENV: &str = "NIFTY_SIGNALS_CONFIG";

// ============================================================================
// Sections
// ============================================================================

/// HTTP server binding
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address. Default "127.0.0.1"; set "0.0.0.0" for remote access
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 4460,
        }
    }
}

/// Snapshot cache tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a snapshot stays fresh
    pub ttl_secs: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

/// Scan cycle tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Daily-bar lookback per symbol
    pub lookback_days: u32,
    /// Symbols evaluated per refresh
    pub universe_limit: usize,
    /// Concurrent fetches per wave
    pub batch_size: usize,
    /// Articles kept in the news list
    pub news_limit: usize,
    /// Seconds between background refreshes
    pub refresh_interval_secs: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            lookback_days: 300,
            universe_limit: 60,
            batch_size: 15,
            news_limit: 40,
            refresh_interval_secs: 3600,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// "json" for structured output, "pretty" for human-readable
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            log_format: "pretty".into(),
        }
    }
}

// ============================================================================
// Root Config
// ============================================================================

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub scan: ScanConfig,
    /// Target/stop-loss multiplier ladder; defaults to the standard table
    pub levels: LevelPolicy,
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration: file (if pointed at) merged under env overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                let raw = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {path}"))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {path}"))?
            }
            Err(_) => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("NIFTY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("NIFTY_PORT") {
            self.server.port = port;
        }
        if let Some(ttl) = env_parse("NIFTY_CACHE_TTL_SECS") {
            self.cache.ttl_secs = ttl;
        }
        if let Some(limit) = env_parse("NIFTY_UNIVERSE_LIMIT") {
            self.scan.universe_limit = limit;
        }
        if let Ok(level) = std::env::var("NIFTY_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("NIFTY_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Engine tunables derived from the cache, scan and levels sections.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            lookback_days: self.scan.lookback_days,
            universe_limit: self.scan.universe_limit,
            batch_size: self.scan.batch_size,
            ttl_secs: self.cache.ttl_secs,
            news_limit: self.scan.news_limit,
            policy: self.levels.clone(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
