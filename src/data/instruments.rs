//! Instrument directory for NSE/BSE equities.
//!
//! Loads the tradable universe from the Upstox instrument dump (one gzipped
//! CSV per exchange), keeps it in memory for the process lifetime, and
//! answers exact-symbol lookups, substring searches and full enumeration.
//!
//! The dump is large and changes at most daily, so it is loaded once behind a
//! single-flight cell: concurrent first callers await one download.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

// ============================================================================
// Constants
// ============================================================================

/// Instrument dump URL template (`{}` = exchange, e.g. NSE)
const INSTRUMENT_DUMP_URL: &str =
    "https://assets.upstox.com/market-quote/instruments/exchange/{}.csv.gz";

/// Exchanges included in the universe
const EXCHANGES: &[&str] = &["NSE", "BSE"];

/// Download timeout; the dump is a few MB
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Maximum results returned by a search
const SEARCH_LIMIT: usize = 15;

// ============================================================================
// Instrument Types
// ============================================================================

/// A tradable instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Provider-specific instrument key (e.g. "NSE_EQ|INE002A01018")
    pub instrument_key: String,
    /// Exchange segment (e.g. "NSE_EQ", "BSE_EQ")
    pub exchange: String,
    /// Trading symbol (e.g. "RELIANCE")
    pub symbol: String,
    /// Company name
    pub name: String,
}

impl Instrument {
    /// Chart API symbol with the exchange suffix applied.
    ///
    /// NSE maps to `.NS`, BSE to `.BO`; anything else defaults to NSE.
    pub fn yahoo_symbol(&self) -> String {
        let suffix = if self.exchange.starts_with("BSE") { ".BO" } else { ".NS" };
        format!("{}{}", self.symbol, suffix)
    }
}

/// Search result: one symbol grouped across the exchanges that list it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentGroup {
    pub symbol: String,
    pub name: String,
    pub exchanges: Vec<String>,
    /// Instrument key per exchange
    pub instrument_keys: HashMap<String, String>,
}

/// Errors from the instrument directory
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("failed to decode instrument dump: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(err.to_string())
        }
    }
}

// ============================================================================
// Directory Trait
// ============================================================================

/// Supplies the instrument universe and lookups over it.
#[async_trait]
pub trait InstrumentDirectory: Send + Sync {
    /// The full equity universe, both exchanges.
    async fn list_all(&self) -> Result<Vec<Instrument>, DirectoryError>;

    /// Exact trading-symbol lookup (first match across exchanges).
    async fn find_symbol(&self, symbol: &str) -> Result<Option<Instrument>, DirectoryError>;

    /// Case-insensitive substring search over symbol and name, grouped by
    /// symbol and capped at 15 results.
    async fn search(&self, query: &str) -> Result<Vec<InstrumentGroup>, DirectoryError>;
}

// ============================================================================
// Upstox Directory
// ============================================================================

/// Directory backed by the Upstox instrument dump, loaded once per process.
pub struct UpstoxDirectory {
    client: reqwest::Client,
    instruments: OnceCell<Vec<Instrument>>,
}

impl UpstoxDirectory {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            instruments: OnceCell::new(),
        }
    }

    /// Load (or return the cached) universe.
    async fn load(&self) -> Result<&Vec<Instrument>, DirectoryError> {
        self.instruments
            .get_or_try_init(|| async {
                let mut all = Vec::new();
                for exchange in EXCHANGES {
                    match self.fetch_exchange(exchange).await {
                        Ok(mut list) => all.append(&mut list),
                        Err(e) => {
                            // One exchange failing should not empty the whole
                            // universe, but both failing is a load failure.
                            warn!(exchange, error = %e, "Instrument dump fetch failed");
                        }
                    }
                }

                if all.is_empty() {
                    return Err(DirectoryError::Decode(
                        "no instruments loaded from any exchange".to_string(),
                    ));
                }

                info!(count = all.len(), "Loaded NSE/BSE instrument universe");
                Ok(all)
            })
            .await
    }

    async fn fetch_exchange(&self, exchange: &str) -> Result<Vec<Instrument>, DirectoryError> {
        let url = INSTRUMENT_DUMP_URL.replace("{}", exchange);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let compressed = response.bytes().await?;

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(|e| DirectoryError::Decode(e.to_string()))?;

        Ok(parse_instrument_csv(&text))
    }
}

impl Default for UpstoxDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InstrumentDirectory for UpstoxDirectory {
    async fn list_all(&self) -> Result<Vec<Instrument>, DirectoryError> {
        Ok(self.load().await?.clone())
    }

    async fn find_symbol(&self, symbol: &str) -> Result<Option<Instrument>, DirectoryError> {
        let upper = symbol.to_uppercase();
        Ok(self
            .load()
            .await?
            .iter()
            .find(|i| i.symbol == upper)
            .cloned())
    }

    async fn search(&self, query: &str) -> Result<Vec<InstrumentGroup>, DirectoryError> {
        Ok(search_instruments(self.load().await?, query))
    }
}

// ============================================================================
// CSV Parsing & Search
// ============================================================================

/// Parse the instrument dump, keeping equity rows only.
fn parse_instrument_csv(text: &str) -> Vec<Instrument> {
    let mut lines = text.lines();
    let header = match lines.next() {
        Some(h) => h,
        None => return Vec::new(),
    };

    let columns: Vec<String> = split_csv_line(header)
        .into_iter()
        .map(|c| c.to_lowercase())
        .collect();
    let idx = |name: &str| columns.iter().position(|c| c == name);

    let (key_idx, exch_idx, sym_idx, name_idx, type_idx) = match (
        idx("instrument_key"),
        idx("exchange"),
        idx("tradingsymbol"),
        idx("name"),
        idx("instrument_type"),
    ) {
        (Some(a), Some(b), Some(c), Some(d), Some(e)) => (a, b, c, d, e),
        _ => return Vec::new(),
    };

    lines
        .filter_map(|line| {
            let fields = split_csv_line(line);
            if fields.get(type_idx).map(String::as_str) != Some("EQUITY") {
                return None;
            }
            Some(Instrument {
                instrument_key: fields.get(key_idx)?.clone(),
                exchange: fields.get(exch_idx)?.clone(),
                symbol: fields.get(sym_idx)?.clone(),
                name: fields.get(name_idx)?.clone(),
            })
        })
        .collect()
}

/// Split one CSV line, honoring double-quoted fields (company names contain
/// commas).
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);

    fields
}

/// Substring search over symbol and name, grouped by symbol across exchanges.
pub fn search_instruments(instruments: &[Instrument], query: &str) -> Vec<InstrumentGroup> {
    if query.len() < 2 {
        return Vec::new();
    }
    let query = query.to_lowercase();

    let mut grouped: Vec<InstrumentGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in instruments {
        if !item.symbol.to_lowercase().contains(&query)
            && !item.name.to_lowercase().contains(&query)
        {
            continue;
        }

        match index.get(&item.symbol) {
            Some(&pos) => {
                let group = &mut grouped[pos];
                if !group.exchanges.contains(&item.exchange) {
                    group.exchanges.push(item.exchange.clone());
                    group
                        .instrument_keys
                        .insert(item.exchange.clone(), item.instrument_key.clone());
                }
            }
            None => {
                index.insert(item.symbol.clone(), grouped.len());
                grouped.push(InstrumentGroup {
                    symbol: item.symbol.clone(),
                    name: item.name.clone(),
                    exchanges: vec![item.exchange.clone()],
                    instrument_keys: HashMap::from([(
                        item.exchange.clone(),
                        item.instrument_key.clone(),
                    )]),
                });
            }
        }
    }

    grouped.truncate(SEARCH_LIMIT);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
instrument_key,exchange,tradingsymbol,name,instrument_type
NSE_EQ|INE002A01018,NSE_EQ,RELIANCE,\"RELIANCE INDUSTRIES LTD\",EQUITY
BSE_EQ|INE002A01018,BSE_EQ,RELIANCE,\"RELIANCE INDUSTRIES LTD\",EQUITY
NSE_EQ|INE040A01034,NSE_EQ,HDFCBANK,\"HDFC BANK LTD\",EQUITY
NSE_FO|12345,NSE_FO,RELIANCE24SEP,\"RELIANCE FUT\",FUTURES
NSE_EQ|INE0XYZ,NSE_EQ,TATAMOTORS,\"TATA MOTORS, DVR\",EQUITY
";

    #[test]
    fn test_parse_keeps_equity_only() {
        let instruments = parse_instrument_csv(SAMPLE_CSV);
        assert_eq!(instruments.len(), 4);
        assert!(instruments.iter().all(|i| !i.symbol.contains("24SEP")));
    }

    #[test]
    fn test_parse_handles_quoted_commas() {
        let instruments = parse_instrument_csv(SAMPLE_CSV);
        let tata = instruments.iter().find(|i| i.symbol == "TATAMOTORS").unwrap();
        assert_eq!(tata.name, "TATA MOTORS, DVR");
    }

    #[test]
    fn test_search_groups_across_exchanges() {
        let instruments = parse_instrument_csv(SAMPLE_CSV);
        let results = search_instruments(&instruments, "reliance");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exchanges.len(), 2);
        assert!(results[0].instrument_keys.contains_key("NSE_EQ"));
        assert!(results[0].instrument_keys.contains_key("BSE_EQ"));
    }

    #[test]
    fn test_search_rejects_short_queries() {
        let instruments = parse_instrument_csv(SAMPLE_CSV);
        assert!(search_instruments(&instruments, "r").is_empty());
    }

    #[test]
    fn test_yahoo_symbol_suffix() {
        let instruments = parse_instrument_csv(SAMPLE_CSV);
        let nse = instruments.iter().find(|i| i.exchange == "NSE_EQ").unwrap();
        let bse = instruments.iter().find(|i| i.exchange == "BSE_EQ").unwrap();
        assert!(nse.yahoo_symbol().ends_with(".NS"));
        assert!(bse.yahoo_symbol().ends_with(".BO"));
    }
}
