//! Text sentiment scoring.
//!
//! Scans article titles for exact ticker mentions and scores the surrounding
//! text against two keyword lists: one tuned for same-day reactions, one for
//! multi-week catalysts. Produces per-symbol intraday/swing affinity scores
//! with a noise floor so one stray mention never becomes a setup.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data::Instrument;
use crate::feeds::Article;

use super::classifier::Direction;

// ============================================================================
// Keyword Lists
// ============================================================================

/// Same-day reaction keywords (positive)
const INTRADAY_POSITIVE: &[&str] = &[
    "surge", "soar", "rally", "breakout", "spike", "jump", "upgrade", "record high", "buyback",
    "bonus issue", "block deal",
];

/// Same-day reaction keywords (negative)
const INTRADAY_NEGATIVE: &[&str] = &[
    "fraud", "probe", "crash", "plunge", "downgrade", "raid", "default", "slump", "scam",
    "penalty", "resignation",
];

/// Multi-week catalyst keywords (positive)
const SWING_POSITIVE: &[&str] = &[
    "growth", "expansion", "order win", "acquisition", "partnership", "capex", "margin improvement",
    "new plant", "contract", "demand",
];

/// Multi-week catalyst keywords (negative)
const SWING_NEGATIVE: &[&str] = &[
    "debt", "headwinds", "litigation", "slowdown", "attrition", "pledge", "write-off",
    "weak guidance",
];

/// Common English words that collide with real tickers; never matched as
/// symbols regardless of directory contents
const STOP_WORDS: &[&str] = &[
    "IT", "ALL", "CAN", "FOR", "NEW", "ONE", "MAX", "BEST", "ANY", "ARE", "YOU", "HAS", "NOW",
    "GET", "SET", "TOP", "MAN", "END", "BIG", "LOW", "HIGH", "INDIA", "NIFTY", "SENSEX",
];

/// Minimum symbol length matched as an entity (avoids "IT"-style collisions)
const MIN_SYMBOL_LEN: usize = 3;

/// Noise floor: both scores at or below this magnitude are discarded
const NOISE_FLOOR: f64 = 1.0;

/// Maximum reason strings kept per symbol
const MAX_REASONS: usize = 3;

// Scoring weights
const INTRADAY_POS_WEIGHT: f64 = 2.0;
const INTRADAY_NEG_WEIGHT: f64 = 2.5;
const SWING_POS_WEIGHT: f64 = 1.5;
const SWING_NEG_WEIGHT: f64 = 1.5;
const SWING_CARRYOVER_WEIGHT: f64 = 0.5;

// ============================================================================
// Scored Output
// ============================================================================

/// Per-symbol accumulated sentiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSentiment {
    pub symbol: String,
    pub name: String,
    pub intraday_score: f64,
    pub swing_score: f64,
    pub direction: Direction,
    /// Headlines that drove the score, at most three
    pub reasons: Vec<String>,
}

/// Sentiment results bucketed by horizon
#[derive(Debug, Clone, Default)]
pub struct SentimentOutcome {
    pub intraday: Vec<SymbolSentiment>,
    pub swing: Vec<SymbolSentiment>,
}

// ============================================================================
// Scorer
// ============================================================================

/// Market-relevance pattern for the news display list
static RELEVANCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)NSE|BSE|stock|market|share|nifty|sensex").unwrap());

/// Keyword-weighted sentiment scorer with symbol entity matching
pub struct SentimentScorer {
    /// Symbol -> company name, stop-word filtered
    symbols: HashMap<String, String>,
}

impl SentimentScorer {
    /// Build a scorer over the given instrument universe.
    pub fn new(instruments: &[Instrument]) -> Self {
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let symbols = instruments
            .iter()
            .filter(|i| i.symbol.len() >= MIN_SYMBOL_LEN)
            .filter(|i| !stop_words.contains(i.symbol.as_str()))
            .map(|i| (i.symbol.to_uppercase(), i.name.clone()))
            .collect();

        Self { symbols }
    }

    /// Whether an article is worth showing in the news list: a market
    /// keyword in the title, a social-feed source, or a ticker mention.
    pub fn is_relevant(&self, article: &Article) -> bool {
        RELEVANCE_PATTERN.is_match(&article.title)
            || article.source.starts_with("Reddit")
            || !self.mentioned_symbols(&article.title).is_empty()
    }

    /// Score a batch of articles into per-symbol horizon buckets.
    pub fn score(&self, articles: &[Article]) -> SentimentOutcome {
        let mut accumulated: HashMap<String, SymbolSentiment> = HashMap::new();

        for article in articles {
            // Relevance: a market keyword or at least one ticker mention.
            // Articles without a mention cannot move any symbol's score.
            let mentioned = self.mentioned_symbols(&article.title);
            if mentioned.is_empty() {
                continue;
            }

            let text = format!("{} {}", article.title, article.snippet).to_lowercase();
            let pos_intra = count_keywords(&text, INTRADAY_POSITIVE);
            let neg_intra = count_keywords(&text, INTRADAY_NEGATIVE);
            let pos_swing = count_keywords(&text, SWING_POSITIVE);
            let neg_swing = count_keywords(&text, SWING_NEGATIVE);

            let intraday_delta =
                INTRADAY_POS_WEIGHT * pos_intra - INTRADAY_NEG_WEIGHT * neg_intra;
            let swing_delta = SWING_POS_WEIGHT * pos_swing - SWING_NEG_WEIGHT * neg_swing
                + SWING_CARRYOVER_WEIGHT * pos_intra;

            for symbol in mentioned {
                let name = self.symbols.get(&symbol).cloned().unwrap_or_default();
                let entry = accumulated
                    .entry(symbol.clone())
                    .or_insert_with(|| SymbolSentiment {
                        symbol,
                        name,
                        intraday_score: 0.0,
                        swing_score: 0.0,
                        direction: Direction::Bullish,
                        reasons: Vec::new(),
                    });

                entry.intraday_score += intraday_delta;
                entry.swing_score += swing_delta;
                if entry.reasons.len() < MAX_REASONS {
                    entry.reasons.push(article.title.clone());
                }
            }
        }

        let mut outcome = SentimentOutcome::default();

        for (_, mut sentiment) in accumulated {
            // Noise floor: weak signals in both horizons are discarded.
            if sentiment.intraday_score.abs() <= NOISE_FLOOR
                && sentiment.swing_score.abs() <= NOISE_FLOOR
            {
                continue;
            }

            let net = sentiment.intraday_score + sentiment.swing_score;
            if net == 0.0 {
                continue;
            }
            sentiment.direction = if net > 0.0 {
                Direction::Bullish
            } else {
                Direction::Bearish
            };

            if sentiment.intraday_score.abs() >= sentiment.swing_score.abs() {
                outcome.intraday.push(sentiment);
            } else {
                outcome.swing.push(sentiment);
            }
        }

        outcome
    }

    /// Exact uppercase token matches of known symbols in a title.
    fn mentioned_symbols(&self, title: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        title
            .split_whitespace()
            .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|token| token.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()))
            .filter(|token| self.symbols.contains_key(*token))
            .filter(|token| seen.insert(token.to_string()))
            .map(|token| token.to_string())
            .collect()
    }
}

fn count_keywords(text: &str, keywords: &[&str]) -> f64 {
    keywords
        .iter()
        .map(|kw| text.matches(kw).count())
        .sum::<usize>() as f64
}
