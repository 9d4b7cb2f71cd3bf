//! Pure technical-indicator computations.
//!
//! No I/O and no side effects: every function takes price/volume slices and
//! returns either a full indicator series or the latest value. Callers decide
//! what to do when a series is too short; functions here return empty vectors
//! or `None` rather than guessing a fallback.
//!
//! Implemented: EMA, RSI (Wilder's smoothing), MACD, Bollinger Bands, VWAP,
//! ADX with directional indicators (+DI/-DI).

// ============================================================================
// Moving Averages
// ============================================================================

/// Exponential Moving Average series.
///
/// Multiplier `k = 2 / (period + 1)`, seeded with the SMA of the first
/// `period` values. Returns an empty `Vec` if there is not enough data.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);

    for &v in &values[period..] {
        let prev = out[out.len() - 1];
        out.push(v * k + prev * (1.0 - k));
    }

    out
}

// ============================================================================
// RSI
// ============================================================================

/// Relative Strength Index using Wilder's smoothing (factor `1/period`).
///
/// Returns the latest value, or `None` when fewer than `period + 1` closes
/// are available.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period]
        .iter()
        .map(|&c| if c > 0.0 { c } else { 0.0 })
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = changes[..period]
        .iter()
        .map(|&c| if c < 0.0 { -c } else { 0.0 })
        .sum::<f64>()
        / period as f64;

    for &c in &changes[period..] {
        if c > 0.0 {
            avg_gain = (avg_gain * (period as f64 - 1.0) + c) / period as f64;
            avg_loss = (avg_loss * (period as f64 - 1.0)) / period as f64;
        } else {
            avg_gain = (avg_gain * (period as f64 - 1.0)) / period as f64;
            avg_loss = (avg_loss * (period as f64 - 1.0) + c.abs()) / period as f64;
        }
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

// ============================================================================
// MACD
// ============================================================================

/// Latest MACD values as `(macd_line, signal_line, histogram)`.
///
/// Returns `None` when fewer than `slow + signal` closes are available.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<(f64, f64, f64)> {
    if closes.len() < slow + signal {
        return None;
    }

    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    if fast_ema.is_empty() || slow_ema.is_empty() {
        return None;
    }

    // MACD line = fast EMA - slow EMA, aligned from the slow series start.
    let offset = slow - fast;
    let macd_values: Vec<f64> = (0..slow_ema.len())
        .map(|i| fast_ema[i + offset] - slow_ema[i])
        .collect();

    let signal_ema = ema(&macd_values, signal);
    let signal_line = *signal_ema.last()?;
    let macd_line = *macd_values.last()?;

    Some((macd_line, signal_line, macd_line - signal_line))
}

// ============================================================================
// Bollinger Bands
// ============================================================================

/// Latest Bollinger Bands as `(upper, lower)`.
///
/// SMA-based with population standard deviation over the last `period`
/// closes. Returns `None` when there is not enough data.
pub fn bollinger(closes: &[f64], period: usize, std_mult: f64) -> Option<(f64, f64)> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    let std_dev = variance.sqrt();

    Some((mean + std_mult * std_dev, mean - std_mult * std_dev))
}

// ============================================================================
// VWAP
// ============================================================================

/// Volume-Weighted Average Price over the whole series.
///
/// Typical price `(high + low + close) / 3` weighted by volume. Returns
/// `None` for empty input or zero total volume.
pub fn vwap(highs: &[f64], lows: &[f64], closes: &[f64], volumes: &[f64]) -> Option<f64> {
    let n = closes.len();
    if n == 0 || highs.len() != n || lows.len() != n || volumes.len() != n {
        return None;
    }

    let mut pv_sum = 0.0;
    let mut vol_sum = 0.0;
    for i in 0..n {
        let typical = (highs[i] + lows[i] + closes[i]) / 3.0;
        pv_sum += typical * volumes[i];
        vol_sum += volumes[i];
    }

    if vol_sum <= 0.0 {
        return None;
    }

    Some(pv_sum / vol_sum)
}

// ============================================================================
// ADX / Directional Movement
// ============================================================================

/// Latest ADX with directional indicators, as `(adx, plus_di, minus_di)`.
///
/// Wilder's directional movement system: true range and ±DM are smoothed
/// with factor `1/period`, DX values are then smoothed the same way into the
/// ADX. Needs at least `2 * period + 1` bars; returns `None` otherwise.
pub fn adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<(f64, f64, f64)> {
    let n = closes.len();
    if period == 0 || n < 2 * period + 1 || highs.len() != n || lows.len() != n {
        return None;
    }

    let mut trs = Vec::with_capacity(n - 1);
    let mut plus_dms = Vec::with_capacity(n - 1);
    let mut minus_dms = Vec::with_capacity(n - 1);

    for i in 1..n {
        let up_move = highs[i] - highs[i - 1];
        let down_move = lows[i - 1] - lows[i];

        plus_dms.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dms.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });

        let tr = (highs[i] - lows[i])
            .max((highs[i] - closes[i - 1]).abs())
            .max((lows[i] - closes[i - 1]).abs());
        trs.push(tr);
    }

    // Wilder smoothing seeds: plain sums of the first `period` values.
    let mut atr: f64 = trs[..period].iter().sum();
    let mut plus_dm_s: f64 = plus_dms[..period].iter().sum();
    let mut minus_dm_s: f64 = minus_dms[..period].iter().sum();

    let di_pair = |atr: f64, plus: f64, minus: f64| -> (f64, f64) {
        if atr <= 0.0 {
            return (0.0, 0.0);
        }
        (100.0 * plus / atr, 100.0 * minus / atr)
    };

    let mut dxs = Vec::with_capacity(trs.len() - period + 1);
    let (pdi, mdi) = di_pair(atr, plus_dm_s, minus_dm_s);
    dxs.push(dx_value(pdi, mdi));

    let mut plus_di = pdi;
    let mut minus_di = mdi;

    for i in period..trs.len() {
        atr = atr - atr / period as f64 + trs[i];
        plus_dm_s = plus_dm_s - plus_dm_s / period as f64 + plus_dms[i];
        minus_dm_s = minus_dm_s - minus_dm_s / period as f64 + minus_dms[i];

        let (pdi, mdi) = di_pair(atr, plus_dm_s, minus_dm_s);
        plus_di = pdi;
        minus_di = mdi;
        dxs.push(dx_value(pdi, mdi));
    }

    if dxs.len() < period {
        return None;
    }

    let mut adx_val: f64 = dxs[..period].iter().sum::<f64>() / period as f64;
    for &dx in &dxs[period..] {
        adx_val = (adx_val * (period as f64 - 1.0) + dx) / period as f64;
    }

    Some((adx_val, plus_di, minus_di))
}

fn dx_value(plus_di: f64, minus_di: f64) -> f64 {
    let sum = plus_di + minus_di;
    if sum <= 0.0 {
        return 0.0;
    }
    100.0 * (plus_di - minus_di).abs() / sum
}
