//! End-to-end scan flow tests over mock upstream adapters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use nifty_signals::data::{
    Candle, DirectoryError, Instrument, InstrumentDirectory, InstrumentGroup, Interval,
    MarketDataProvider, ProviderError, Quote,
};
use nifty_signals::engine::{
    Clock, Direction, EngineOptions, Horizon, MemoryStore, SignalCache, SignalEngine,
};
use nifty_signals::feeds::{Article, ArticleFeed, FeedError};

// ============================================================================
// Mock Adapters
// ============================================================================

struct ScriptedDirectory {
    instruments: Vec<Instrument>,
    calls: AtomicUsize,
    /// Calls at or beyond this index fail (usize::MAX = never)
    fail_from: usize,
}

impl ScriptedDirectory {
    fn new(instruments: Vec<Instrument>) -> Self {
        Self {
            instruments,
            calls: AtomicUsize::new(0),
            fail_from: usize::MAX,
        }
    }

    fn failing_from(instruments: Vec<Instrument>, fail_from: usize) -> Self {
        Self {
            instruments,
            calls: AtomicUsize::new(0),
            fail_from,
        }
    }
}

#[async_trait]
impl InstrumentDirectory for ScriptedDirectory {
    async fn list_all(&self) -> Result<Vec<Instrument>, DirectoryError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.fail_from {
            return Err(DirectoryError::Network("directory down".to_string()));
        }
        Ok(self.instruments.clone())
    }

    async fn find_symbol(&self, symbol: &str) -> Result<Option<Instrument>, DirectoryError> {
        Ok(self.instruments.iter().find(|i| i.symbol == symbol).cloned())
    }

    async fn search(&self, query: &str) -> Result<Vec<InstrumentGroup>, DirectoryError> {
        let query = query.to_uppercase();
        Ok(self
            .instruments
            .iter()
            .filter(|i| i.symbol.contains(&query))
            .map(|i| InstrumentGroup {
                symbol: i.symbol.clone(),
                name: i.name.clone(),
                exchanges: vec![i.exchange.clone()],
                instrument_keys: HashMap::new(),
            })
            .collect())
    }
}

struct ScriptedMarket {
    /// Chart symbol (with suffix) -> daily series
    histories: HashMap<String, Vec<Candle>>,
    /// Chart symbol -> intraday series
    intraday: HashMap<String, Vec<Candle>>,
    /// Chart symbol -> last traded price
    quotes: HashMap<String, f64>,
}

impl ScriptedMarket {
    fn empty() -> Self {
        Self {
            histories: HashMap::new(),
            intraday: HashMap::new(),
            quotes: HashMap::new(),
        }
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedMarket {
    async fn daily_history(
        &self,
        symbol: &str,
        _lookback_days: u32,
    ) -> Result<Vec<Candle>, ProviderError> {
        self.histories
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))
    }

    async fn intraday_history(
        &self,
        symbol: &str,
        _interval: Interval,
    ) -> Result<Vec<Candle>, ProviderError> {
        self.intraday
            .get(symbol)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        let last_price = *self
            .quotes
            .get(symbol)
            .ok_or_else(|| ProviderError::UnknownSymbol(symbol.to_string()))?;
        Ok(Quote {
            last_price,
            day_high: last_price,
            day_low: last_price,
            open: last_price,
            prev_close: last_price,
            volume: 1_000_000.0,
        })
    }
}

struct StaticFeed {
    articles: Vec<Article>,
}

#[async_trait]
impl ArticleFeed for StaticFeed {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self) -> Result<Vec<Article>, FeedError> {
        Ok(self.articles.clone())
    }
}

struct FakeClock {
    epoch_secs: AtomicI64,
}

impl FakeClock {
    fn leak() -> &'static Self {
        Box::leak(Box::new(Self {
            epoch_secs: AtomicI64::new(1_700_000_000),
        }))
    }

    fn advance(&self, secs: i64) {
        self.epoch_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for &'static FakeClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.epoch_secs.load(Ordering::SeqCst), 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn instrument(symbol: &str, name: &str) -> Instrument {
    Instrument {
        instrument_key: format!("NSE_EQ|{symbol}"),
        exchange: "NSE_EQ".to_string(),
        symbol: symbol.to_string(),
        name: name.to_string(),
    }
}

/// A steadily climbing daily series: +2% per bar, flat volume.
///
/// Classifies as an extended surge (every bar a gain, RSI pinned high) with
/// a clean +2% final day, so the scan must emit a bullish intraday setup.
fn rising_series(bars: usize) -> Vec<Candle> {
    let mut close = 100.0_f64;
    (0..bars)
        .map(|i| {
            close *= 1.02;
            Candle {
                time: Utc::now() - Duration::days((bars - i) as i64),
                open: close / 1.02,
                high: close * 1.005,
                low: close * 0.99,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

/// A grinding two-steps-up-one-down series: +2 then -1 point per bar.
///
/// Keeps RSI in the mid-60s with the price above VWAP and a firm ADX, the
/// sustained-trend read rather than a one-day spike.
fn momentum_series(bars: usize) -> Vec<Candle> {
    let mut close = 100.0_f64;
    (0..bars)
        .map(|i| {
            let open = close;
            close += if i % 2 == 1 { 2.0 } else { -1.0 };
            if i == 0 {
                close = 100.0;
            }
            Candle {
                time: Utc::now() - Duration::days((bars - i) as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

fn news_article(title: &str) -> Article {
    Article {
        title: title.to_string(),
        link: format!("https://news.example/{}", title.len()),
        published: Utc::now(),
        source: "Google News".to_string(),
        snippet: String::new(),
    }
}

fn engine_with(
    directory: ScriptedDirectory,
    market: ScriptedMarket,
    feeds: Vec<Arc<dyn ArticleFeed>>,
) -> SignalEngine {
    SignalEngine::new(
        Arc::new(directory),
        Arc::new(market),
        feeds,
        EngineOptions::default(),
    )
}

// ============================================================================
// Scan Flow
// ============================================================================

#[tokio::test]
async fn test_technical_scan_emits_intraday_setup_with_ladder_levels() {
    let mut market = ScriptedMarket::empty();
    market
        .histories
        .insert("RELIANCE.NS".to_string(), rising_series(250));

    let engine = engine_with(
        ScriptedDirectory::new(vec![instrument("RELIANCE", "Reliance Industries")]),
        market,
        Vec::new(),
    );

    let (snapshot, _) = engine.snapshot(false).await.expect("scan succeeds");

    let setup = snapshot
        .intraday
        .iter()
        .find(|s| s.symbol == "RELIANCE")
        .expect("rising symbol lands in the intraday bucket");

    assert_eq!(setup.direction, Direction::Bullish);
    assert_eq!(setup.horizon, Horizon::Intraday);
    // Intraday bullish ladder: +7% target, -4% stop, both off the entry.
    assert!((setup.target - (setup.entry * 1.07 * 100.0).round() / 100.0).abs() < 1e-9);
    assert!((setup.stop_loss - (setup.entry * 0.96 * 100.0).round() / 100.0).abs() < 1e-9);
    assert_eq!(setup.status, "ACTIVE");
    assert!(!setup.reasons.is_empty());
}

#[tokio::test]
async fn test_momentum_trend_emits_swing_setup_with_positional_ladder() {
    let mut market = ScriptedMarket::empty();
    market
        .histories
        .insert("RELIANCE.NS".to_string(), momentum_series(250));

    let engine = engine_with(
        ScriptedDirectory::new(vec![instrument("RELIANCE", "Reliance Industries")]),
        market,
        Vec::new(),
    );

    let (snapshot, _) = engine.snapshot(false).await.expect("scan succeeds");

    // A mid-60s RSI grind above VWAP is a positional read: the setup must
    // land in the swing bucket with the multi-week ladder.
    let setup = snapshot
        .swing
        .iter()
        .find(|s| s.symbol == "RELIANCE")
        .expect("momentum trend lands in the swing bucket");

    assert_eq!(setup.direction, Direction::Bullish);
    assert_eq!(setup.horizon, Horizon::Swing);
    assert!((setup.target - (setup.entry * 1.155 * 100.0).round() / 100.0).abs() < 1e-9);
    assert!((setup.stop_loss - (setup.entry * 0.94 * 100.0).round() / 100.0).abs() < 1e-9);
    assert!(snapshot.intraday.iter().all(|s| s.symbol != "RELIANCE"));
}

#[tokio::test]
async fn test_sentiment_setup_priced_from_quote() {
    let mut market = ScriptedMarket::empty();
    // No history at all: the technical path yields nothing, so the price
    // must come from a quote lookup.
    market.quotes.insert("TATASTEEL.NS".to_string(), 165.0);

    let feed: Arc<dyn ArticleFeed> = Arc::new(StaticFeed {
        articles: vec![news_article("TATASTEEL shares surge after breakout rally")],
    });

    let engine = engine_with(
        ScriptedDirectory::new(vec![instrument("TATASTEEL", "Tata Steel")]),
        market,
        vec![feed],
    );

    let (snapshot, _) = engine.snapshot(false).await.expect("scan succeeds");

    let setup = snapshot
        .intraday
        .iter()
        .find(|s| s.symbol == "TATASTEEL")
        .expect("scored symbol lands in the intraday bucket");

    assert_eq!(setup.direction, Direction::Bullish);
    assert!((setup.entry - 165.0).abs() < 1e-9);
    assert!((setup.target - 176.55).abs() < 1e-9);

    // The driving headline is surfaced in the news list.
    assert_eq!(snapshot.news.len(), 1);
}

#[tokio::test]
async fn test_empty_buckets_backfilled_and_disjoint() {
    // Directory works, but every market call fails: no candidates anywhere.
    let engine = engine_with(
        ScriptedDirectory::new(vec![instrument("OBSCURE", "Obscure Industries")]),
        ScriptedMarket::empty(),
        Vec::new(),
    );

    let (snapshot, _) = engine.snapshot(false).await.expect("scan succeeds");

    assert_eq!(snapshot.intraday.len(), 3);
    assert_eq!(snapshot.swing.len(), 3);

    let intraday: Vec<&str> = snapshot.intraday.iter().map(|s| s.symbol.as_str()).collect();
    for setup in &snapshot.swing {
        assert!(!intraday.contains(&setup.symbol.as_str()));
    }
}

#[tokio::test]
async fn test_history_route_resolves_symbol_and_validates_interval() {
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use nifty_signals::config::Config;
    use nifty_signals::routes::{self, HistoryQuery};
    use nifty_signals::SignalState;

    let directory: Arc<dyn InstrumentDirectory> = Arc::new(ScriptedDirectory::new(vec![
        instrument("RELIANCE", "Reliance Industries"),
    ]));
    let mut market = ScriptedMarket::empty();
    market
        .intraday
        .insert("RELIANCE.NS".to_string(), rising_series(10));
    let market: Arc<dyn MarketDataProvider> = Arc::new(market);

    let engine = Arc::new(SignalEngine::new(
        Arc::clone(&directory),
        Arc::clone(&market),
        Vec::new(),
        EngineOptions::default(),
    ));
    let state = Arc::new(SignalState {
        config: Config::default(),
        directory,
        market,
        engine,
    });

    let response = routes::get_history(
        State(Arc::clone(&state)),
        Path("RELIANCE".to_string()),
        Query(HistoryQuery {
            interval: "15m".to_string(),
        }),
    )
    .await
    .expect("history served");

    assert_eq!(response.0.symbol, "RELIANCE");
    assert_eq!(response.0.interval, "15m");
    assert_eq!(response.0.count, 10);

    let (status, _) = routes::get_history(
        State(Arc::clone(&state)),
        Path("RELIANCE".to_string()),
        Query(HistoryQuery {
            interval: "90m".to_string(),
        }),
    )
    .await
    .expect_err("unsupported interval rejected");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = routes::get_history(
        State(state),
        Path("NOSUCH".to_string()),
        Query(HistoryQuery {
            interval: "15m".to_string(),
        }),
    )
    .await
    .expect_err("unknown symbol rejected");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Cache Semantics
// ============================================================================

#[tokio::test]
async fn test_snapshot_identical_within_ttl_and_recomputed_on_force() {
    let mut market = ScriptedMarket::empty();
    market
        .histories
        .insert("RELIANCE.NS".to_string(), rising_series(250));

    let clock = FakeClock::leak();
    let cache = SignalCache::with_parts(Box::new(MemoryStore::new()), Box::new(clock), 3600);
    let engine = SignalEngine::with_cache(
        Arc::new(ScriptedDirectory::new(vec![instrument(
            "RELIANCE",
            "Reliance Industries",
        )])),
        Arc::new(market),
        Vec::new(),
        EngineOptions::default(),
        cache,
    );

    let (first, _) = engine.snapshot(false).await.expect("first scan");
    clock.advance(600);
    let (second, _) = engine.snapshot(false).await.expect("cached read");

    // Within the TTL the payload is byte-identical, setup IDs included.
    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize")
    );

    // A forced refresh recomputes: fresh IDs even though inputs are unchanged.
    let (forced, _) = engine.snapshot(true).await.expect("forced scan");
    assert_ne!(first.intraday[0].id, forced.intraday[0].id);
}

#[tokio::test]
async fn test_stale_snapshot_served_when_refresh_fails() {
    let mut market = ScriptedMarket::empty();
    market
        .histories
        .insert("RELIANCE.NS".to_string(), rising_series(250));

    let clock = FakeClock::leak();
    let cache = SignalCache::with_parts(Box::new(MemoryStore::new()), Box::new(clock), 3600);
    // The directory works exactly once; with no feeds configured, the second
    // refresh has no upstream left and must fail internally.
    let engine = SignalEngine::with_cache(
        Arc::new(ScriptedDirectory::failing_from(
            vec![instrument("RELIANCE", "Reliance Industries")],
            1,
        )),
        Arc::new(market),
        Vec::new(),
        EngineOptions::default(),
        cache,
    );

    let (first, _) = engine.snapshot(false).await.expect("first scan");
    clock.advance(7200);

    let (served, trace) = engine.snapshot(false).await.expect("stale serve");
    assert_eq!(served.last_updated, first.last_updated);
    assert!(trace.iter().any(|line| line.contains("stale")));
}

#[tokio::test]
async fn test_first_ever_failure_surfaces_error() {
    // Nothing upstream works and nothing is cached.
    let engine = engine_with(
        ScriptedDirectory::failing_from(Vec::new(), 0),
        ScriptedMarket::empty(),
        Vec::new(),
    );

    assert!(engine.snapshot(false).await.is_err());
}
