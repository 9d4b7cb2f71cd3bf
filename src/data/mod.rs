//! Market data module.
//!
//! Provides the core candle/quote types, the provider abstraction and the
//! Yahoo chart adapter used for NSE/BSE equities, plus the instrument
//! directory that supplies the scan universe.

mod provider;
mod yahoo;
pub mod instruments;

pub use provider::{MarketDataProvider, ProviderError};
pub use yahoo::YahooChartAdapter;
pub use instruments::{
    DirectoryError, Instrument, InstrumentDirectory, InstrumentGroup, UpstoxDirectory,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// Candle interval for history requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// 1-minute candles
    M1,
    /// 5-minute candles
    M5,
    /// 15-minute candles
    M15,
    /// 30-minute candles
    M30,
    /// 1-hour candles
    H1,
    /// Daily candles
    Daily,
}

impl Interval {
    /// Parse from a chart-style interval string (e.g. "1m", "1d")
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1m" => Some(Self::M1),
            "5m" => Some(Self::M5),
            "15m" => Some(Self::M15),
            "30m" => Some(Self::M30),
            "1h" | "60m" => Some(Self::H1),
            "1d" | "d" => Some(Self::Daily),
            _ => None,
        }
    }

    /// Chart API interval parameter
    pub fn as_api_param(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::Daily => "1d",
        }
    }

    /// Default chart API range for this interval.
    ///
    /// Short intervals only have a few days of upstream history; daily bars
    /// go back a full year.
    pub fn default_range(&self) -> &'static str {
        match self {
            Self::M1 => "5d",
            Self::M5 | Self::M15 | Self::M30 => "1mo",
            Self::H1 => "3mo",
            Self::Daily => "1y",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_param())
    }
}

/// A single candlestick (OHLCV)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Bar timestamp (UTC)
    pub time: DateTime<Utc>,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Traded volume
    pub volume: f64,
}

impl Candle {
    /// Whether this bar is usable for analysis.
    ///
    /// Upstream chart payloads contain null slots for halted sessions; those
    /// arrive here as NaN and must be filtered before any indicator math.
    pub fn is_valid(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.volume >= 0.0
    }
}

/// Latest quote snapshot for a symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Last traded price
    pub last_price: f64,
    /// Session high
    pub day_high: f64,
    /// Session low
    pub day_low: f64,
    /// Session open
    pub open: f64,
    /// Previous session close
    pub prev_close: f64,
    /// Session volume
    pub volume: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_interval_parse_roundtrip() {
        for s in ["1m", "5m", "15m", "30m", "1h", "1d"] {
            let interval = Interval::parse(s).unwrap();
            assert_eq!(interval.as_api_param(), s);
        }
        assert!(Interval::parse("90m").is_none());
    }

    #[test]
    fn test_candle_validity_rejects_nan() {
        let mut candle = Candle {
            time: Utc::now(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: 1000.0,
        };
        assert!(candle.is_valid());

        candle.close = f64::NAN;
        assert!(!candle.is_valid());
    }

    #[test]
    fn test_candle_validity_rejects_negative_volume() {
        let candle = Candle {
            time: Utc::now(),
            open: 100.0,
            high: 101.0,
            low: 99.0,
            close: 100.5,
            volume: -1.0,
        };
        assert!(!candle.is_valid());
    }
}
