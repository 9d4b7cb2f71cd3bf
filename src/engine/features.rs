//! Technical feature extraction.
//!
//! Turns a symbol's daily candle series into the fixed [`FeatureSet`] the
//! catalyst classifier consumes. All indicator fallbacks are named constants
//! so the degraded-data behavior is explicit and testable: a too-short
//! series for one indicator degrades that indicator to its neutral value,
//! while a series below [`MIN_VALID_BARS`] rejects the symbol outright.

use serde::Serialize;

use crate::data::Candle;

use super::indicators;

// ============================================================================
// Extraction Constants
// ============================================================================

/// Minimum valid bars required before a symbol is evaluated at all
pub const MIN_VALID_BARS: usize = 30;

/// Neutral RSI when the series is too short for RSI-14
pub const RSI_FALLBACK: f64 = 50.0;

/// Neutral ADX / +DI / -DI when the series is too short for ADX-14
pub const ADX_FALLBACK: (f64, f64, f64) = (20.0, 20.0, 20.0);

/// Bollinger fallback half-width as a fraction of the latest close
pub const BB_FALLBACK_PCT: f64 = 0.05;

/// Trailing window (bars before the latest) for average volume
pub const AVG_VOLUME_WINDOW: usize = 20;

/// MACD parameters (fast, slow, signal)
pub const MACD_PARAMS: (usize, usize, usize) = (8, 24, 9);

/// Bollinger parameters (period, sigma multiplier)
pub const BB_PARAMS: (usize, f64) = (20, 2.0);

// ============================================================================
// Feature Set
// ============================================================================

/// Snapshot of every technical feature for one symbol at one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSet {
    /// Latest valid close
    pub latest_close: f64,
    /// Close one bar before the latest
    pub previous_close: f64,
    /// Day-over-day change in percent
    pub change_pct: f64,

    /// EMA stack (latest values; latest close when history is too short)
    pub ema9: f64,
    pub ema21: f64,
    pub ema50: f64,
    pub ema200: f64,
    /// EMA-50 one bar prior (for fresh-cross detection)
    pub ema50_prev: f64,
    /// EMA-200 one bar prior
    pub ema200_prev: f64,
    /// Whether enough history existed to compute a real EMA-200 series
    pub has_ema200_history: bool,

    /// RSI-14 (Wilder), neutral fallback 50
    pub rsi14: f64,
    /// MACD(8,24,9) latest values
    pub macd_line: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    /// Bollinger(20, 2σ) bounds
    pub bb_upper: f64,
    pub bb_lower: f64,
    /// VWAP over the full series
    pub vwap: f64,
    /// ADX-14 with directional components
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,

    /// Average volume over the 20 bars preceding the latest
    pub avg_volume_20: f64,
    /// Latest volume relative to that average (1.0 when the average is
    /// non-positive)
    pub volume_multiplier: f64,
}

/// Extract a feature set from a daily candle series.
///
/// Invalid bars (NaN fields, negative volume) are dropped first; if fewer
/// than [`MIN_VALID_BARS`] remain the symbol is rejected with `None`.
pub fn extract(candles: &[Candle]) -> Option<FeatureSet> {
    let valid: Vec<&Candle> = candles.iter().filter(|c| c.is_valid()).collect();
    if valid.len() < MIN_VALID_BARS {
        return None;
    }

    let closes: Vec<f64> = valid.iter().map(|c| c.close).collect();
    let highs: Vec<f64> = valid.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = valid.iter().map(|c| c.low).collect();
    let volumes: Vec<f64> = valid.iter().map(|c| c.volume).collect();

    let latest_close = closes[closes.len() - 1];
    let previous_close = closes[closes.len() - 2];
    let change_pct = (latest_close - previous_close) / previous_close * 100.0;

    // EMA stack with latest-close degradation for too-short periods, so
    // downstream comparisons read "flat" instead of failing.
    let ema_last_pair = |period: usize| -> (f64, f64, bool) {
        let series = indicators::ema(&closes, period);
        match series.len() {
            0 => (latest_close, latest_close, false),
            1 => (series[0], series[0], true),
            n => (series[n - 1], series[n - 2], true),
        }
    };

    let (ema9, _, _) = ema_last_pair(9);
    let (ema21, _, _) = ema_last_pair(21);
    let (ema50, ema50_prev, _) = ema_last_pair(50);
    let (ema200, ema200_prev, has_ema200_history) = ema_last_pair(200);

    let rsi14 = indicators::rsi(&closes, 14).unwrap_or(RSI_FALLBACK);

    let (fast, slow, signal) = MACD_PARAMS;
    let (macd_line, macd_signal, macd_histogram) =
        indicators::macd(&closes, fast, slow, signal).unwrap_or((0.0, 0.0, 0.0));

    let (bb_period, bb_sigma) = BB_PARAMS;
    let (bb_upper, bb_lower) = indicators::bollinger(&closes, bb_period, bb_sigma)
        .unwrap_or_else(|| {
            (
                latest_close * (1.0 + BB_FALLBACK_PCT),
                latest_close * (1.0 - BB_FALLBACK_PCT),
            )
        });

    let vwap = indicators::vwap(&highs, &lows, &closes, &volumes).unwrap_or(latest_close);

    let (adx, plus_di, minus_di) =
        indicators::adx(&highs, &lows, &closes, 14).unwrap_or(ADX_FALLBACK);

    // Trailing average excludes the latest bar.
    let latest_volume = volumes[volumes.len() - 1];
    let trailing = &volumes[volumes.len() - 1 - AVG_VOLUME_WINDOW..volumes.len() - 1];
    let avg_volume_20 = trailing.iter().sum::<f64>() / AVG_VOLUME_WINDOW as f64;
    let volume_multiplier = if avg_volume_20 > 0.0 {
        latest_volume / avg_volume_20
    } else {
        1.0
    };

    Some(FeatureSet {
        latest_close,
        previous_close,
        change_pct,
        ema9,
        ema21,
        ema50,
        ema200,
        ema50_prev,
        ema200_prev,
        has_ema200_history,
        rsi14,
        macd_line,
        macd_signal,
        macd_histogram,
        bb_upper,
        bb_lower,
        vwap,
        adx,
        plus_di,
        minus_di,
        avg_volume_20,
        volume_multiplier,
    })
}
