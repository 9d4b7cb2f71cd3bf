//! Yahoo Finance v8 chart API adapter.
//!
//! # Endpoint
//! `GET https://query1.finance.yahoo.com/v8/finance/chart/{symbol}?interval=..&range=..`
//!
//! # Notes
//! - NSE symbols are suffixed `.NS`, BSE symbols `.BO` (see
//!   [`Instrument::yahoo_symbol`](super::instruments::Instrument::yahoo_symbol)).
//! - Quote arrays contain null slots for halted sessions; they are mapped to
//!   NaN here and filtered by callers via `Candle::is_valid`.
//! - Unknown symbols produce an empty candle list, not an error.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use super::provider::{MarketDataProvider, ProviderError};
use super::{Candle, Interval, Quote};

// ============================================================================
// Constants
// ============================================================================

/// Chart API base URL
const CHART_API_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Browser-like user agent; the chart endpoint rejects the default one
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Default per-request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_day_high: Option<f64>,
    regular_market_day_low: Option<f64>,
    regular_market_open: Option<f64>,
    regular_market_volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<QuoteArrays>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteArrays {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ============================================================================
// Adapter
// ============================================================================

/// Yahoo chart API client
pub struct YahooChartAdapter {
    client: reqwest::Client,
}

impl YahooChartAdapter {
    /// Create a new adapter with the default request timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Map a daily lookback window to a chart range parameter
    fn range_for_days(lookback_days: u32) -> &'static str {
        match lookback_days {
            0..=30 => "1mo",
            31..=90 => "3mo",
            91..=180 => "6mo",
            181..=365 => "1y",
            _ => "2y",
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        interval: &str,
        range: &str,
    ) -> Result<ChartResult, ProviderError> {
        let url = format!("{CHART_API_BASE}/{symbol}");

        let response = self
            .client
            .get(&url)
            .query(&[("interval", interval), ("range", range)])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::UnknownSymbol(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: ChartResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        body.chart
            .result
            .and_then(|mut results| if results.is_empty() { None } else { Some(results.remove(0)) })
            .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))
    }

    fn into_candles(result: ChartResult) -> Vec<Candle> {
        let timestamps = match result.timestamp {
            Some(ts) if !ts.is_empty() => ts,
            _ => return Vec::new(),
        };
        let quotes = match result.indicators.quote.into_iter().next() {
            Some(q) => q,
            None => return Vec::new(),
        };

        let at = |arr: &[Option<f64>], i: usize| arr.get(i).copied().flatten();

        timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, &ts)| {
                let time = Utc.timestamp_opt(ts, 0).single()?;
                Some(Candle {
                    time,
                    open: at(&quotes.open, i).unwrap_or(f64::NAN),
                    high: at(&quotes.high, i).unwrap_or(f64::NAN),
                    low: at(&quotes.low, i).unwrap_or(f64::NAN),
                    close: at(&quotes.close, i).unwrap_or(f64::NAN),
                    volume: at(&quotes.volume, i).unwrap_or(0.0),
                })
            })
            .collect()
    }
}

impl Default for YahooChartAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartAdapter {
    async fn daily_history(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<Vec<Candle>, ProviderError> {
        let range = Self::range_for_days(lookback_days);
        debug!(symbol, range, "Fetching daily history");

        let result = self.fetch_chart(symbol, "1d", range).await?;
        Ok(Self::into_candles(result))
    }

    async fn intraday_history(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Vec<Candle>, ProviderError> {
        let result = self
            .fetch_chart(symbol, interval.as_api_param(), interval.default_range())
            .await?;
        Ok(Self::into_candles(result))
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let result = self.fetch_chart(symbol, "1m", "1d").await?;
        let meta = &result.meta;

        let prev_close = meta
            .previous_close
            .or(meta.chart_previous_close)
            .ok_or_else(|| ProviderError::Malformed("missing previous close".to_string()))?;
        let last_price = meta.regular_market_price.unwrap_or(prev_close);

        Ok(Quote {
            last_price,
            day_high: meta.regular_market_day_high.unwrap_or(last_price),
            day_low: meta.regular_market_day_low.unwrap_or(last_price),
            open: meta.regular_market_open.unwrap_or(last_price),
            prev_close,
            volume: meta.regular_market_volume.unwrap_or(0.0),
        })
    }
}
