//! Market data provider abstraction.
//!
//! Defines the `MarketDataProvider` trait the signal engine consumes, so the
//! scan pipeline can run against the real chart API in production and mock
//! providers in tests.

use async_trait::async_trait;
use thiserror::Error;

use super::{Candle, Interval, Quote};

// ============================================================================
// Provider Errors
// ============================================================================

/// Errors from a market data provider.
///
/// All of these are recoverable from the engine's point of view: a failed
/// symbol is skipped, never fatal to a scan wave.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level failure (timeout, DNS, connection reset)
    #[error("network error: {0}")]
    Network(String),

    /// Upstream returned a non-success status
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// Payload could not be decoded into the expected shape
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The symbol is unknown upstream
    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// A source of OHLCV history and quote snapshots.
///
/// Implementations must tolerate unknown symbols by returning an empty
/// series where feasible rather than an error, and must never panic on
/// malformed upstream data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for the trailing `lookback_days` calendar days.
    ///
    /// The returned series is ordered oldest-first. Bars with null upstream
    /// fields are preserved as NaN; callers filter with `Candle::is_valid`.
    async fn daily_history(&self, symbol: &str, lookback_days: u32)
        -> Result<Vec<Candle>, ProviderError>;

    /// Intraday bars at the given interval over the provider's default range.
    async fn intraday_history(&self, symbol: &str, interval: Interval)
        -> Result<Vec<Candle>, ProviderError>;

    /// Latest quote snapshot for a symbol.
    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError>;
}
