//! Candidate ranking, deduplication and fallback substitution.
//!
//! Merges setups from the technical and sentiment paths, enforces the strict
//! dedup rule (a symbol appears at most once across both buckets), sorts by
//! conviction and truncates each bucket. An empty bucket is backfilled from
//! a curated static list so the API never shows nothing.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::classifier::{Candidate, DeepSummary, Direction, Regime};
use super::levels::{setup_from_candidate, Horizon, LevelPolicy, Setup};

/// Maximum setups per bucket
pub const MAX_PER_BUCKET: usize = 5;

/// Fallback entries used when a bucket comes out empty
const FALLBACK_COUNT: usize = 3;

// ============================================================================
// Ranking
// ============================================================================

/// Rank both buckets and enforce cross-bucket symbol uniqueness.
///
/// Within each bucket the strongest entry per symbol survives; across
/// buckets a duplicated symbol stays where its conviction is higher
/// (intraday wins ties). Output is sorted by conviction descending and
/// truncated to [`MAX_PER_BUCKET`].
pub fn rank_and_dedup(
    intraday: Vec<Setup>,
    swing: Vec<Setup>,
) -> (Vec<Setup>, Vec<Setup>) {
    let mut intraday = dedup_within(intraday);
    let mut swing = dedup_within(swing);

    // Cross-bucket: drop the weaker copy of a shared symbol.
    let mut drop_from_swing = HashSet::new();
    let mut drop_from_intraday = HashSet::new();
    for setup in &intraday {
        if let Some(other) = swing.iter().find(|s| s.symbol == setup.symbol) {
            if other.conviction > setup.conviction {
                drop_from_intraday.insert(setup.symbol.clone());
            } else {
                drop_from_swing.insert(setup.symbol.clone());
            }
        }
    }
    intraday.retain(|s| !drop_from_intraday.contains(&s.symbol));
    swing.retain(|s| !drop_from_swing.contains(&s.symbol));

    sort_by_conviction(&mut intraday);
    sort_by_conviction(&mut swing);
    intraday.truncate(MAX_PER_BUCKET);
    swing.truncate(MAX_PER_BUCKET);

    (intraday, swing)
}

fn dedup_within(setups: Vec<Setup>) -> Vec<Setup> {
    let mut sorted = setups;
    sort_by_conviction(&mut sorted);

    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter(|s| seen.insert(s.symbol.clone()))
        .collect()
}

fn sort_by_conviction(setups: &mut [Setup]) {
    setups.sort_by(|a, b| {
        b.conviction
            .partial_cmp(&a.conviction)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

// ============================================================================
// Fallback List
// ============================================================================

/// Curated fallback entries: symbol, name, indicative price, reason.
///
/// These are deliberately static literals; substituting them is a UX policy
/// ("never show nothing"), not a data-quality signal.
const FALLBACK_ENTRIES: &[(&str, &str, f64, &str)] = &[
    (
        "RELIANCE",
        "Reliance Industries",
        2950.0,
        "Breaking out of consolidation with strong momentum and positive telecom tariff developments.",
    ),
    (
        "HDFCBANK",
        "HDFC Bank",
        1650.0,
        "Attractive valuation, steady margin recovery, and strong core credit growth metrics.",
    ),
    (
        "TATASTEEL",
        "Tata Steel",
        165.0,
        "Benefiting from robust domestic infrastructure demand and stabilizing global metal prices.",
    ),
    (
        "INFY",
        "Infosys",
        1850.0,
        "Margin expansion expected in upcoming quarters with a strong large-deal pipeline.",
    ),
    (
        "LT",
        "Larsen & Toubro",
        3600.0,
        "Unprecedented order book visibility providing strong revenue growth certainty.",
    ),
    (
        "ICICIBANK",
        "ICICI Bank",
        1150.0,
        "Robust asset quality and consistent earnings delivery over multiple quarters.",
    ),
    (
        "HAL",
        "Hindustan Aeronautics Ltd",
        4500.0,
        "Massive defense order inflows and government localization push driving rapid growth.",
    ),
    (
        "BAJFINANCE",
        "Bajaj Finance",
        7200.0,
        "Strong AUM growth and moderating credit costs leading to earnings upgrades.",
    ),
];

/// Fill an empty bucket from the fallback list.
///
/// Deterministic: entries are taken from the top of the list, skipping any
/// symbol already used in the other bucket so the dedup invariant holds.
pub fn fallback_setups(
    horizon: Horizon,
    policy: &LevelPolicy,
    now: DateTime<Utc>,
    exclude: &HashSet<String>,
) -> Vec<Setup> {
    FALLBACK_ENTRIES
        .iter()
        .filter(|(symbol, _, _, _)| !exclude.contains(*symbol))
        .take(FALLBACK_COUNT)
        .map(|(symbol, name, price, reason)| {
            let candidate = Candidate {
                symbol: symbol.to_string(),
                name: name.to_string(),
                direction: Direction::Bullish,
                regime: Regime::StableAccumulation,
                rationale: reason.to_string(),
                current_price: *price,
                change_pct: 0.0,
                volume_multiplier: 1.0,
                reasons: vec![reason.to_string()],
                deep_summary: DeepSummary {
                    technical: "Curated watchlist entry; indicative reference levels".to_string(),
                    emotional: reason.to_string(),
                    insider: "No live flow data for curated entries".to_string(),
                },
            };
            setup_from_candidate(&candidate, horizon, policy, now)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(symbol: &str, horizon: Horizon, conviction: f64) -> Setup {
        let candidate = Candidate {
            symbol: symbol.to_string(),
            name: format!("{symbol} Ltd"),
            direction: Direction::Bullish,
            regime: Regime::MomentumZone,
            rationale: String::new(),
            current_price: 100.0,
            change_pct: conviction,
            volume_multiplier: 1.0,
            reasons: Vec::new(),
            deep_summary: DeepSummary {
                technical: String::new(),
                emotional: String::new(),
                insider: String::new(),
            },
        };
        setup_from_candidate(&candidate, horizon, &LevelPolicy::default(), Utc::now())
    }

    #[test]
    fn test_dedup_within_bucket_keeps_strongest() {
        let (intraday, _) = rank_and_dedup(
            vec![
                setup("AAA", Horizon::Intraday, 2.0),
                setup("AAA", Horizon::Intraday, 5.0),
            ],
            Vec::new(),
        );

        assert_eq!(intraday.len(), 1);
        assert!((intraday[0].conviction - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_bucket_dedup_keeps_higher_conviction() {
        let (intraday, swing) = rank_and_dedup(
            vec![setup("AAA", Horizon::Intraday, 2.0)],
            vec![setup("AAA", Horizon::Swing, 4.0)],
        );

        assert!(intraday.is_empty());
        assert_eq!(swing.len(), 1);
    }

    #[test]
    fn test_cross_bucket_tie_prefers_intraday() {
        let (intraday, swing) = rank_and_dedup(
            vec![setup("AAA", Horizon::Intraday, 3.0)],
            vec![setup("AAA", Horizon::Swing, 3.0)],
        );

        assert_eq!(intraday.len(), 1);
        assert!(swing.is_empty());
    }

    #[test]
    fn test_sorted_and_truncated_to_five() {
        let setups: Vec<Setup> = (0..8)
            .map(|i| setup(&format!("SYM{i}"), Horizon::Intraday, i as f64))
            .collect();

        let (intraday, _) = rank_and_dedup(setups, Vec::new());

        assert_eq!(intraday.len(), MAX_PER_BUCKET);
        assert!((intraday[0].conviction - 7.0).abs() < 1e-9);
        for pair in intraday.windows(2) {
            assert!(pair[0].conviction >= pair[1].conviction);
        }
    }

    #[test]
    fn test_fallback_fills_deterministically() {
        let first = fallback_setups(
            Horizon::Swing,
            &LevelPolicy::default(),
            Utc::now(),
            &HashSet::new(),
        );
        let second = fallback_setups(
            Horizon::Swing,
            &LevelPolicy::default(),
            Utc::now(),
            &HashSet::new(),
        );

        assert_eq!(first.len(), 3);
        let symbols: Vec<&str> = first.iter().map(|s| s.symbol.as_str()).collect();
        let symbols2: Vec<&str> = second.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, symbols2);
    }

    #[test]
    fn test_fallback_respects_exclusions() {
        let exclude: HashSet<String> = ["RELIANCE".to_string()].into();
        let setups = fallback_setups(
            Horizon::Intraday,
            &LevelPolicy::default(),
            Utc::now(),
            &exclude,
        );

        assert!(setups.iter().all(|s| s.symbol != "RELIANCE"));
        assert_eq!(setups.len(), 3);
    }

    #[test]
    fn test_fallback_ladder_applies() {
        let setups = fallback_setups(
            Horizon::Swing,
            &LevelPolicy::default(),
            Utc::now(),
            &HashSet::new(),
        );
        for s in &setups {
            assert!(s.target > s.entry);
            assert!(s.stop_loss < s.entry);
        }
    }
}
