//! Nifty Signals - signal-scanning service for NSE/BSE equities.
//!
//! Serves ranked intraday and swing trade setups built from daily candles,
//! news coverage and social chatter.

use anyhow::Result;
use nifty_signals::config::Config;
use nifty_signals::logging::init_logging;
use nifty_signals::SignalService;

#[tokio::main]
async fn main() -> Result<()> {
    // Start timing immediately for cold-start measurement
    let startup_start = std::time::Instant::now();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Nifty Signals v{}", env!("CARGO_PKG_VERSION"));

    // Start the signals service
    let service = SignalService::new(config);

    // Log startup timing before entering the serve loop
    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Service initialized in {:?}",
        startup_duration
    );

    service.start().await
}
