//! Signal engine module.
//!
//! The central orchestrator for a scan cycle: instrument universe in, ranked
//! intraday/swing setups out, with the result held in a single-slot TTL
//! cache. One refresh runs at a time behind a single-flight guard; readers
//! either hit the fresh cache or await the in-flight computation.

pub mod cache;
pub mod classifier;
pub mod features;
pub mod indicators;
pub mod levels;
pub mod ranking;
pub mod sentiment;

pub use cache::{CacheState, Clock, MemoryStore, SignalCache, SignalSnapshot, SignalStore, SystemClock};
pub use classifier::{Candidate, DeepSummary, Direction, Regime};
pub use features::FeatureSet;
pub use levels::{Horizon, LevelPolicy, Setup};
pub use sentiment::{SentimentScorer, SymbolSentiment};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::data::{Instrument, InstrumentDirectory, MarketDataProvider};
use crate::feeds::{Article, ArticleFeed};

// ============================================================================
// Engine Options
// ============================================================================

/// Tunables for a scan cycle
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Daily-bar lookback per symbol
    pub lookback_days: u32,
    /// Symbols scanned per refresh (head of the directory listing)
    pub universe_limit: usize,
    /// Concurrent symbol fetches per wave
    pub batch_size: usize,
    /// Cache TTL in seconds
    pub ttl_secs: i64,
    /// Articles kept in the news list
    pub news_limit: usize,
    /// Target/stop-loss ladder
    pub policy: LevelPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            lookback_days: 300,
            universe_limit: 60,
            batch_size: 15,
            ttl_secs: 3600,
            news_limit: 40,
            policy: LevelPolicy::default(),
        }
    }
}

impl Regime {
    /// Default holding horizon per regime: fast, extended patterns trade
    /// same-session; sustained-trend and structural reads get weeks.
    pub fn default_horizon(&self) -> Horizon {
        match self {
            Regime::ExplosiveTrend | Regime::VolatilityBreakout | Regime::ParabolicSurge => {
                Horizon::Intraday
            }
            Regime::GoldenCross
            | Regime::MomentumZone
            | Regime::BullishPullback
            | Regime::StableAccumulation => Horizon::Swing,
        }
    }
}

// ============================================================================
// Signal Engine
// ============================================================================

/// The scan orchestrator
pub struct SignalEngine {
    directory: Arc<dyn InstrumentDirectory>,
    market: Arc<dyn MarketDataProvider>,
    feeds: Vec<Arc<dyn ArticleFeed>>,
    cache: SignalCache,
    /// Single-flight guard: concurrent stale readers await one refresh
    refresh_guard: Mutex<()>,
    options: EngineOptions,
}

impl SignalEngine {
    pub fn new(
        directory: Arc<dyn InstrumentDirectory>,
        market: Arc<dyn MarketDataProvider>,
        feeds: Vec<Arc<dyn ArticleFeed>>,
        options: EngineOptions,
    ) -> Self {
        let cache = SignalCache::new(options.ttl_secs);
        Self::with_cache(directory, market, feeds, options, cache)
    }

    /// Construct with an injected cache (tests pass a fake clock/store).
    pub fn with_cache(
        directory: Arc<dyn InstrumentDirectory>,
        market: Arc<dyn MarketDataProvider>,
        feeds: Vec<Arc<dyn ArticleFeed>>,
        options: EngineOptions,
        cache: SignalCache,
    ) -> Self {
        Self {
            directory,
            market,
            feeds,
            cache,
            refresh_guard: Mutex::new(()),
            options,
        }
    }

    /// Serve the current snapshot, refreshing if stale or forced.
    ///
    /// Degradation policy: a failed refresh serves the last good snapshot;
    /// an error is only surfaced when no snapshot has ever been computed.
    pub async fn snapshot(&self, force: bool) -> Result<(SignalSnapshot, Vec<String>)> {
        if !force {
            if let Some(snapshot) = self.cache.get_fresh() {
                let age = (self.cache.now() - snapshot.last_updated).num_seconds();
                return Ok((snapshot, vec![format!("served from cache, age {age}s")]));
            }
        }

        let _flight = self.refresh_guard.lock().await;

        // Re-check after the wait: another caller may have refreshed while
        // this one queued on the guard.
        if !force {
            if let Some(snapshot) = self.cache.get_fresh() {
                return Ok((snapshot, vec!["served from cache after awaiting refresh".to_string()]));
            }
        }

        match self.refresh().await {
            Ok((snapshot, trace)) => Ok((snapshot, trace)),
            Err(e) => match self.cache.get_any() {
                Some(stale) => {
                    warn!(error = %e, "Refresh failed, serving stale snapshot");
                    Ok((stale, vec![format!("refresh failed ({e}), served stale snapshot")]))
                }
                None => Err(e),
            },
        }
    }

    /// Run one full scan cycle and store the result.
    async fn refresh(&self) -> Result<(SignalSnapshot, Vec<String>)> {
        let mut trace = Vec::new();
        let started = std::time::Instant::now();

        // Text sources first: articles feed both the news list and the
        // sentiment path.
        let articles = self.fetch_articles(&mut trace).await;

        let instruments = match self.directory.list_all().await {
            Ok(list) => list,
            Err(e) => {
                trace.push(format!("instrument directory unavailable: {e}"));
                Vec::new()
            }
        };

        if instruments.is_empty() && articles.is_empty() {
            return Err(anyhow!("all upstream sources failed"));
        }

        let scorer = SentimentScorer::new(&instruments);

        // Technical path: bounded fan-out over the universe head.
        let universe: Vec<Instrument> = instruments
            .iter()
            .take(self.options.universe_limit)
            .cloned()
            .collect();
        let (candidates, price_map) = self.scan_universe(&universe, &mut trace).await;

        let now = self.cache.now();
        let mut intraday: Vec<Setup> = Vec::new();
        let mut swing: Vec<Setup> = Vec::new();

        for candidate in &candidates {
            let horizon = candidate.regime.default_horizon();
            let setup = levels::setup_from_candidate(candidate, horizon, &self.options.policy, now);
            match horizon {
                Horizon::Intraday => intraday.push(setup),
                Horizon::Swing => swing.push(setup),
            }
        }

        // Sentiment path: price each surviving symbol off its latest close
        // (scan cache first, quote fetch as fallback).
        let outcome = scorer.score(&articles);
        trace.push(format!(
            "sentiment: {} intraday, {} swing symbols above noise floor",
            outcome.intraday.len(),
            outcome.swing.len()
        ));

        for (sentiments, horizon) in [
            (&outcome.intraday, Horizon::Intraday),
            (&outcome.swing, Horizon::Swing),
        ] {
            for sentiment in sentiments {
                match self.price_for(sentiment, &price_map).await {
                    Some(price) => {
                        let setup = levels::setup_from_sentiment(
                            sentiment,
                            horizon,
                            price,
                            &self.options.policy,
                            now,
                        );
                        match horizon {
                            Horizon::Intraday => intraday.push(setup),
                            Horizon::Swing => swing.push(setup),
                        }
                    }
                    None => {
                        trace.push(format!("{}: no price, sentiment setup skipped", sentiment.symbol));
                    }
                }
            }
        }

        // Audit: previous setups not regenerated this cycle survive only
        // while unresolved at the latest known price.
        if let Some(previous) = self.cache.get_any() {
            let fresh_symbols: HashSet<String> = intraday
                .iter()
                .chain(&swing)
                .map(|s| s.symbol.clone())
                .collect();

            for prior in previous.intraday.into_iter().chain(previous.swing) {
                if fresh_symbols.contains(&prior.symbol) {
                    continue;
                }
                match price_map.get(&prior.symbol) {
                    Some(&price) if !prior.is_resolved(price) => {
                        match prior.horizon {
                            Horizon::Intraday => intraday.push(prior),
                            Horizon::Swing => swing.push(prior),
                        }
                    }
                    Some(_) => {
                        trace.push(format!("audit: {} resolved, dropped", prior.symbol));
                    }
                    None => {
                        // No price this cycle; without a read we cannot vouch
                        // for the levels, so the setup is not carried.
                    }
                }
            }
        }

        let (mut intraday, mut swing) = ranking::rank_and_dedup(intraday, swing);

        // Never show nothing: an empty bucket is backfilled from the curated
        // list, excluding symbols the other bucket already uses.
        if intraday.is_empty() {
            let used: HashSet<String> = swing.iter().map(|s| s.symbol.clone()).collect();
            intraday = ranking::fallback_setups(Horizon::Intraday, &self.options.policy, now, &used);
            trace.push("intraday bucket empty, fallback list substituted".to_string());
        }
        if swing.is_empty() {
            let used: HashSet<String> = intraday.iter().map(|s| s.symbol.clone()).collect();
            swing = ranking::fallback_setups(Horizon::Swing, &self.options.policy, now, &used);
            trace.push("swing bucket empty, fallback list substituted".to_string());
        }

        let news: Vec<Article> = articles
            .into_iter()
            .filter(|a| scorer.is_relevant(a))
            .take(self.options.news_limit)
            .collect();

        self.cache.put(intraday, swing, news);
        let snapshot = self
            .cache
            .get_any()
            .ok_or_else(|| anyhow!("cache write was not observable"))?;

        info!(
            intraday = snapshot.intraday.len(),
            swing = snapshot.swing.len(),
            news = snapshot.news.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Scan cycle complete"
        );
        trace.push(format!(
            "cycle done in {}ms: {} intraday, {} swing",
            started.elapsed().as_millis(),
            snapshot.intraday.len(),
            snapshot.swing.len()
        ));

        Ok((snapshot, trace))
    }

    /// Pull every article feed, tolerating individual failures.
    async fn fetch_articles(&self, trace: &mut Vec<String>) -> Vec<Article> {
        let fetches = self.feeds.iter().map(|feed| {
            let feed = Arc::clone(feed);
            async move { (feed.name().to_string(), feed.fetch().await) }
        });

        let mut batches = Vec::new();
        for (name, result) in futures::future::join_all(fetches).await {
            match result {
                Ok(batch) => {
                    trace.push(format!("feed {name}: {} articles", batch.len()));
                    batches.push(batch);
                }
                Err(e) => {
                    warn!(feed = %name, error = %e, "Feed fetch failed");
                    trace.push(format!("feed {name} failed: {e}"));
                }
            }
        }

        crate::feeds::dedup_by_link(batches)
    }

    /// Evaluate the universe in bounded waves; returns surviving candidates
    /// plus the latest close per evaluated symbol (for pricing and audits).
    async fn scan_universe(
        &self,
        universe: &[Instrument],
        trace: &mut Vec<String>,
    ) -> (Vec<Candidate>, HashMap<String, f64>) {
        let lookback = self.options.lookback_days;

        let evaluations = stream::iter(universe.iter().cloned())
            .map(|instrument| {
                let market = Arc::clone(&self.market);
                async move {
                    let candles = match market
                        .daily_history(&instrument.yahoo_symbol(), lookback)
                        .await
                    {
                        Ok(candles) => candles,
                        Err(e) => {
                            debug!(symbol = %instrument.symbol, error = %e, "History fetch failed");
                            return (instrument, None, None);
                        }
                    };

                    match features::extract(&candles) {
                        Some(feature_set) => {
                            let price = feature_set.latest_close;
                            let candidate = classifier::classify(
                                &instrument.symbol,
                                &instrument.name,
                                &feature_set,
                            );
                            (instrument, candidate, Some(price))
                        }
                        None => (instrument, None, None),
                    }
                }
            })
            .buffer_unordered(self.options.batch_size)
            .collect::<Vec<_>>()
            .await;

        let mut candidates = Vec::new();
        let mut price_map = HashMap::new();
        let mut skipped = 0usize;

        for (instrument, candidate, price) in evaluations {
            match price {
                Some(price) => {
                    price_map.insert(instrument.symbol.clone(), price);
                }
                None => skipped += 1,
            }
            if let Some(candidate) = candidate {
                candidates.push(candidate);
            }
        }

        trace.push(format!(
            "scanned {} symbols: {} candidates, {} skipped (no data / thin history)",
            universe.len(),
            candidates.len(),
            skipped
        ));

        (candidates, price_map)
    }

    /// Latest price for a sentiment symbol: scan cache first, then a quote.
    async fn price_for(
        &self,
        sentiment: &SymbolSentiment,
        price_map: &HashMap<String, f64>,
    ) -> Option<f64> {
        if let Some(&price) = price_map.get(&sentiment.symbol) {
            return Some(price);
        }

        let instrument = self
            .directory
            .find_symbol(&sentiment.symbol)
            .await
            .ok()
            .flatten()?;

        match self.market.quote(&instrument.yahoo_symbol()).await {
            Ok(quote) => Some(quote.last_price),
            Err(e) => {
                debug!(symbol = %sentiment.symbol, error = %e, "Quote fetch failed");
                None
            }
        }
    }

    /// Cache freshness, for the status endpoint.
    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    /// Timestamp of the last stored snapshot, if any.
    pub fn last_updated(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.cache.get_any().map(|s| s.last_updated)
    }
}
