//! Nifty Signals - NSE/BSE signal-scanning service.
//!
//! Scans an Indian equity universe for technical setups, scores news and
//! social chatter for sentiment-driven ideas, and serves ranked intraday and
//! swing recommendations over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    nifty-signals (Rust Service)                  │
//! │                            :4460                                 │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌───────────────┐  ┌───────────────────────┐  │
//! │  │ Market Data  │  │ Signal Engine │  │  Article Feeds        │  │
//! │  │ (Yahoo chart │  │ (features →   │  │  (Google News RSS,    │  │
//! │  │  + Upstox    │  │  classify →   │  │   Reddit listings)    │  │
//! │  │  directory)  │  │  rank)        │  │                       │  │
//! │  └──────────────┘  └───────────────┘  └───────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Two signal paths
//! - **Technical**: daily candles → indicator features → regime classifier
//! - **Sentiment**: article titles → ticker mentions → keyword scoring
//!
//! ## Horizons
//! - **Intraday**: same-session setups with tight levels
//! - **Swing**: multi-week positional setups with wider levels
//!
//! All results land in a single TTL-cached snapshot; a failed refresh serves
//! the last good snapshot rather than an error.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod data;
pub mod engine;
pub mod feeds;
pub mod logging;
pub mod routes;

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::data::{InstrumentDirectory, MarketDataProvider, UpstoxDirectory, YahooChartAdapter};
use crate::engine::SignalEngine;
use crate::feeds::{ArticleFeed, GoogleNewsFeed, RedditFeed};

/// Signals service state
pub struct SignalState {
    /// Configuration
    pub config: Config,
    /// Instrument directory (symbol search, universe listing)
    pub directory: Arc<dyn InstrumentDirectory>,
    /// Market data provider (candle history, quotes)
    pub market: Arc<dyn MarketDataProvider>,
    /// Scan orchestrator
    pub engine: Arc<SignalEngine>,
}

impl SignalState {
    /// Create a new signals state with production adapters
    pub fn new(config: Config) -> Self {
        let directory: Arc<dyn InstrumentDirectory> = Arc::new(UpstoxDirectory::new());
        let market: Arc<dyn MarketDataProvider> = Arc::new(YahooChartAdapter::new());
        let feeds: Vec<Arc<dyn ArticleFeed>> = vec![
            Arc::new(GoogleNewsFeed::new()),
            Arc::new(RedditFeed::new()),
        ];

        let engine = Arc::new(SignalEngine::new(
            Arc::clone(&directory),
            Arc::clone(&market),
            feeds,
            config.engine_options(),
        ));

        Self {
            config,
            directory,
            market,
            engine,
        }
    }
}

/// Main signals service
pub struct SignalService {
    state: Arc<SignalState>,
}

impl SignalService {
    /// Create a new signals service
    pub fn new(config: Config) -> Self {
        let state = Arc::new(SignalState::new(config));
        Self { state }
    }

    /// Start the signals service
    pub async fn start(self) -> Result<()> {
        let host = self.state.config.server.host.clone();
        let port = self.state.config.server.port;

        // Build HTTP routes
        let app = Router::new()
            .route("/health", get(routes::health))
            .route("/api/v1/signals", get(routes::get_signals))
            .route("/api/v1/search", get(routes::search))
            .route("/api/v1/history/:symbol", get(routes::get_history))
            .route("/api/v1/status", get(routes::get_status))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone());

        // Start the background refresher so the first request rarely pays
        // the full scan cost.
        let refresh_state = self.state.clone();
        tokio::spawn(async move {
            run_background_refresher(refresh_state).await;
        });

        // Start HTTP server
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        tracing::info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Refresh the snapshot in a loop so readers mostly hit a warm cache
async fn run_background_refresher(state: Arc<SignalState>) {
    let interval = std::time::Duration::from_secs(state.config.scan.refresh_interval_secs);

    loop {
        match state.engine.snapshot(false).await {
            Ok((snapshot, _)) => {
                tracing::debug!(
                    intraday = snapshot.intraday.len(),
                    swing = snapshot.swing.len(),
                    "Background refresh complete"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Background refresh failed");
            }
        }

        tokio::time::sleep(interval).await;
    }
}
