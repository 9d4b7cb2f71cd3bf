//! HTTP routes for the signals service.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{Candle, InstrumentGroup, Interval};
use crate::engine::{CacheState, Setup};
use crate::feeds::Article;
use crate::SignalState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// Query parameters for the signals endpoint
#[derive(Debug, Default, Deserialize)]
pub struct SignalsQuery {
    /// Bypass the cache TTL and recompute
    #[serde(default)]
    pub force: bool,
    /// Attach the scan trace to the response
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Serialize)]
pub struct SignalsResponse {
    pub intraday_setups: Vec<Setup>,
    pub swing_setups: Vec<Setup>,
    pub news: Vec<Article>,
    pub last_updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<InstrumentGroup>,
    pub count: usize,
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Candle interval, chart-style (e.g. "5m", "15m", "1h")
    #[serde(default = "default_history_interval")]
    pub interval: String,
}

fn default_history_interval() -> String {
    "15m".to_string()
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub symbol: String,
    pub interval: String,
    pub candles: Vec<Candle>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub cache_state: String,
    pub last_updated: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn internal_error(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "nifty-signals".to_string(),
    })
}

/// Current signal snapshot.
///
/// Always 200 with a best-effort payload once any snapshot exists; 500 with
/// an error body only when the very first computation fails.
pub async fn get_signals(
    State(state): State<Arc<SignalState>>,
    Query(query): Query<SignalsQuery>,
) -> Result<Json<SignalsResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.engine.snapshot(query.force).await {
        Ok((snapshot, trace)) => Ok(Json(SignalsResponse {
            intraday_setups: snapshot.intraday,
            swing_setups: snapshot.swing,
            news: snapshot.news,
            last_updated: snapshot.last_updated.to_rfc3339(),
            debug: query.debug.then_some(trace),
        })),
        Err(e) => {
            tracing::error!(error = %e, "Signal snapshot unavailable");
            Err(internal_error(format!("signal computation failed: {e}")))
        }
    }
}

/// Instrument search by symbol or company name
pub async fn search(
    State(state): State<Arc<SignalState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.directory.search(&query.q).await {
        Ok(results) => {
            let count = results.len();
            Ok(Json(SearchResponse { results, count }))
        }
        Err(e) => {
            tracing::error!(error = %e, "Instrument search failed");
            Err(internal_error(format!("search failed: {e}")))
        }
    }
}

/// Intraday candle history for one symbol.
///
/// The symbol is resolved through the instrument directory so callers use
/// plain trading symbols without the chart-API exchange suffix.
pub async fn get_history(
    State(state): State<Arc<SignalState>>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let interval = Interval::parse(&query.interval).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("unsupported interval: {}", query.interval),
            }),
        )
    })?;

    let instrument = match state.directory.find_symbol(&symbol).await {
        Ok(Some(instrument)) => instrument,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("unknown symbol: {symbol}"),
                }),
            ))
        }
        Err(e) => {
            tracing::error!(error = %e, "Symbol resolution failed");
            return Err(internal_error(format!("symbol resolution failed: {e}")));
        }
    };

    match state
        .market
        .intraday_history(&instrument.yahoo_symbol(), interval)
        .await
    {
        Ok(mut candles) => {
            candles.retain(Candle::is_valid);
            let count = candles.len();
            Ok(Json(HistoryResponse {
                symbol: instrument.symbol,
                interval: interval.to_string(),
                candles,
                count,
            }))
        }
        Err(e) => {
            tracing::error!(symbol = %instrument.symbol, error = %e, "History fetch failed");
            Err(internal_error(format!("history fetch failed: {e}")))
        }
    }
}

/// Get service status
pub async fn get_status(State(state): State<Arc<SignalState>>) -> Json<StatusResponse> {
    let cache_state = match state.engine.cache_state() {
        CacheState::Empty => "empty",
        CacheState::Fresh => "fresh",
        CacheState::Stale => "stale",
    };

    Json(StatusResponse {
        cache_state: cache_state.to_string(),
        last_updated: state.engine.last_updated().map(|t| t.to_rfc3339()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_payload_field_names() {
        let response = SignalsResponse {
            intraday_setups: Vec::new(),
            swing_setups: Vec::new(),
            news: Vec::new(),
            last_updated: "2026-01-01T00:00:00+00:00".to_string(),
            debug: None,
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"intraday_setups\""));
        assert!(json.contains("\"swing_setups\""));
        assert!(json.contains("\"news\""));
        // Absent unless requested.
        assert!(!json.contains("\"debug\""));
    }

    #[test]
    fn test_history_interval_default() {
        let query: HistoryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.interval, "15m");
        assert!(Interval::parse(&query.interval).is_some());
    }
}
