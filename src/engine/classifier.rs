//! Catalyst classification.
//!
//! Applies the regime decision policy over an extracted [`FeatureSet`]:
//! hard-reject gates first, then a priority-ordered regime ladder where the
//! first matching rule wins. Survivors are always bullish; bearish setups
//! only ever come from the sentiment path.

use serde::{Deserialize, Serialize};

use super::features::FeatureSet;

// ============================================================================
// Classification Types
// ============================================================================

/// Trade direction of a candidate or setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "Bullish"),
            Self::Bearish => write!(f, "Bearish"),
        }
    }
}

/// Qualitative regime describing why a symbol qualified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    StableAccumulation,
    ExplosiveTrend,
    VolatilityBreakout,
    GoldenCross,
    MomentumZone,
    BullishPullback,
    ParabolicSurge,
}

impl Regime {
    /// Display label used in API payloads
    pub fn label(&self) -> &'static str {
        match self {
            Self::StableAccumulation => "Stable-Accumulation",
            Self::ExplosiveTrend => "Explosive-Trend",
            Self::VolatilityBreakout => "Volatility-Breakout",
            Self::GoldenCross => "Golden-Cross",
            Self::MomentumZone => "Momentum-Zone",
            Self::BullishPullback => "Bullish-Pullback",
            Self::ParabolicSurge => "Parabolic-Surge",
        }
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Narrative strings surfaced to the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepSummary {
    /// Indicator readout: EMA stack, RSI band, Bollinger bounds
    pub technical: String,
    /// Crowd-psychology framing of the move
    pub emotional: String,
    /// Volume-flow framing keyed to the volume multiplier
    pub insider: String,
}

/// A classified symbol, before target/stop-loss derivation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub name: String,
    pub direction: Direction,
    pub regime: Regime,
    /// One-line justification: trend state plus ADX magnitude
    pub rationale: String,
    pub current_price: f64,
    pub change_pct: f64,
    pub volume_multiplier: f64,
    /// Short reason tags, at most three
    pub reasons: Vec<String>,
    pub deep_summary: DeepSummary,
}

// ============================================================================
// Decision Policy
// ============================================================================

/// Meaningfully red days are excluded regardless of other signals
const MAX_RED_CHANGE_PCT: f64 = -0.5;

/// Without structural trend confirmation, require at least this move
const MIN_UNCONFIRMED_CHANGE_PCT: f64 = 1.5;

/// Classify a symbol's features into a candidate, or reject with `None`.
pub fn classify(symbol: &str, name: &str, features: &FeatureSet) -> Option<Candidate> {
    if features.change_pct < MAX_RED_CHANGE_PCT {
        return None;
    }

    let is_bullish_trend =
        features.ema9 > features.ema21 && features.latest_close > features.ema50;
    // Freshly crossed only: above now, at-or-below one bar prior.
    let is_golden_cross = features.has_ema200_history
        && features.ema50 > features.ema200
        && features.ema50_prev <= features.ema200_prev;
    let is_above_vwap = features.latest_close > features.vwap;

    if !is_bullish_trend && !is_golden_cross && features.change_pct < MIN_UNCONFIRMED_CHANGE_PCT {
        return None;
    }

    let regime = assign_regime(features, is_bullish_trend, is_golden_cross, is_above_vwap)?;

    Some(Candidate {
        symbol: symbol.to_string(),
        name: name.to_string(),
        direction: Direction::Bullish,
        regime,
        rationale: build_rationale(features, is_bullish_trend, is_golden_cross),
        current_price: features.latest_close,
        change_pct: features.change_pct,
        volume_multiplier: features.volume_multiplier,
        reasons: build_reasons(features, regime),
        deep_summary: build_deep_summary(features, regime),
    })
}

/// Priority-ordered regime ladder; first matching rule wins.
fn assign_regime(
    f: &FeatureSet,
    is_bullish_trend: bool,
    is_golden_cross: bool,
    is_above_vwap: bool,
) -> Option<Regime> {
    if f.change_pct > 3.0 && f.volume_multiplier > 1.2 && f.adx > 25.0 && f.plus_di > f.minus_di {
        return Some(Regime::ExplosiveTrend);
    }

    if f.latest_close > f.bb_upper && f.volume_multiplier > 1.5 {
        return Some(Regime::VolatilityBreakout);
    }

    if is_golden_cross {
        return Some(Regime::GoldenCross);
    }

    if f.rsi14 > 60.0 && f.rsi14 < 75.0 && is_above_vwap && f.adx > 20.0 {
        return Some(Regime::MomentumZone);
    }

    if f.rsi14 < 40.0 && is_bullish_trend {
        return Some(Regime::BullishPullback);
    }

    if f.rsi14 >= 75.0 {
        // A stalling overbought top is a chase, not a setup.
        if f.change_pct < 1.0 {
            return None;
        }
        return Some(Regime::ParabolicSurge);
    }

    if f.adx < 20.0 || f.plus_di < f.minus_di {
        return None;
    }

    Some(Regime::StableAccumulation)
}

// ============================================================================
// Narrative Builders
// ============================================================================

fn build_rationale(f: &FeatureSet, is_bullish_trend: bool, is_golden_cross: bool) -> String {
    let trend = if is_golden_cross {
        "EMA-50 has just crossed above EMA-200"
    } else if is_bullish_trend {
        "price holds above EMA-50 with a rising short-term stack"
    } else {
        "momentum is running ahead of trend structure"
    };

    let strength = if f.adx > 25.0 {
        "strong directional pressure"
    } else if f.adx > 20.0 {
        "building directional pressure"
    } else {
        "mild directional pressure"
    };

    format!(
        "{trend}; ADX {:.1} shows {strength}, day change {:+.2}%",
        f.adx, f.change_pct
    )
}

fn rsi_band(rsi: f64) -> &'static str {
    if rsi > 70.0 {
        "near-overbought"
    } else if rsi < 40.0 {
        "oversold-dip"
    } else {
        "momentum zone"
    }
}

fn build_reasons(f: &FeatureSet, regime: Regime) -> Vec<String> {
    let mut reasons = vec![format!("{} pattern", regime.label())];

    if f.change_pct.abs() >= 1.0 {
        reasons.push(format!("{:+.1}% on the day", f.change_pct));
    }
    if f.volume_multiplier >= 1.2 {
        reasons.push(format!("{:.1}x average volume", f.volume_multiplier));
    } else if f.adx > 25.0 {
        reasons.push(format!("ADX {:.0} trend strength", f.adx));
    }

    reasons.truncate(3);
    reasons
}

fn build_deep_summary(f: &FeatureSet, regime: Regime) -> DeepSummary {
    let technical = format!(
        "EMA stack 9/21/50 at {:.2}/{:.2}/{:.2}; RSI {:.1} ({}); Bollinger band {:.2}-{:.2}",
        f.ema9,
        f.ema21,
        f.ema50,
        f.rsi14,
        rsi_band(f.rsi14),
        f.bb_lower,
        f.bb_upper
    );

    let emotional = match regime {
        Regime::ExplosiveTrend | Regime::ParabolicSurge => {
            "Crowd excitement is peaking; late buyers are chasing the move".to_string()
        }
        Regime::VolatilityBreakout | Regime::GoldenCross => {
            "Sentiment is turning decisively positive after a long base".to_string()
        }
        Regime::BullishPullback => {
            "Weak hands are shaking out while the larger uptrend holds".to_string()
        }
        Regime::MomentumZone | Regime::StableAccumulation => {
            "Steady optimism without euphoria; participation is broadening".to_string()
        }
    };

    let insider = if f.volume_multiplier > 2.0 {
        format!(
            "Volume at {:.1}x the 20-day average suggests aggressive institutional accumulation",
            f.volume_multiplier
        )
    } else if f.volume_multiplier > 1.2 {
        format!(
            "Volume running {:.1}x above average points to quiet position building",
            f.volume_multiplier
        )
    } else {
        "Volume is unremarkable; the move is price-led rather than flow-led".to_string()
    };

    DeepSummary {
        technical,
        emotional,
        insider,
    }
}
