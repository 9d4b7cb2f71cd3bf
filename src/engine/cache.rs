//! Single-slot TTL cache for scan results.
//!
//! One global snapshot per process: refreshed when stale or forced, served
//! as-is while fresh. The backing store and the clock are both traits so
//! tests can drive expiry with a fake clock instead of sleeping, and the
//! write path replaces the whole snapshot so readers never observe a
//! partially updated payload.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::feeds::Article;

use super::levels::Setup;

// ============================================================================
// Snapshot
// ============================================================================

/// One complete scan result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub intraday: Vec<Setup>,
    pub swing: Vec<Setup>,
    pub news: Vec<Article>,
    pub last_updated: DateTime<Utc>,
}

/// Cache freshness states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No snapshot has ever been stored
    Empty,
    /// A snapshot exists and its TTL has not elapsed
    Fresh,
    /// A snapshot exists but its TTL has elapsed
    Stale,
}

// ============================================================================
// Clock & Store Traits
// ============================================================================

/// Time source, injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Snapshot storage, injectable for tests.
///
/// Implementations must make `save` an atomic whole-snapshot replacement.
pub trait SignalStore: Send + Sync {
    fn load(&self) -> Option<SignalSnapshot>;
    fn save(&self, snapshot: SignalSnapshot);
}

/// In-memory store; the production default
#[derive(Default)]
pub struct MemoryStore {
    slot: RwLock<Option<SignalSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalStore for MemoryStore {
    fn load(&self) -> Option<SignalSnapshot> {
        self.slot.read().ok().and_then(|guard| guard.clone())
    }

    fn save(&self, snapshot: SignalSnapshot) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = Some(snapshot);
        }
    }
}

// ============================================================================
// TTL Cache
// ============================================================================

/// TTL wrapper over a store and a clock
pub struct SignalCache {
    store: Box<dyn SignalStore>,
    clock: Box<dyn Clock>,
    ttl: Duration,
}

impl SignalCache {
    /// Production cache: in-memory store, system clock.
    pub fn new(ttl_secs: i64) -> Self {
        Self::with_parts(Box::new(MemoryStore::new()), Box::new(SystemClock), ttl_secs)
    }

    /// Fully injected cache for tests.
    pub fn with_parts(store: Box<dyn SignalStore>, clock: Box<dyn Clock>, ttl_secs: i64) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::seconds(ttl_secs),
        }
    }

    /// Current freshness state.
    pub fn state(&self) -> CacheState {
        match self.store.load() {
            None => CacheState::Empty,
            Some(snapshot) => {
                if self.clock.now() - snapshot.last_updated < self.ttl {
                    CacheState::Fresh
                } else {
                    CacheState::Stale
                }
            }
        }
    }

    /// The snapshot if it is still fresh.
    pub fn get_fresh(&self) -> Option<SignalSnapshot> {
        match self.state() {
            CacheState::Fresh => self.store.load(),
            _ => None,
        }
    }

    /// The snapshot regardless of freshness (stale-serve fallback).
    pub fn get_any(&self) -> Option<SignalSnapshot> {
        self.store.load()
    }

    /// Store a new snapshot stamped with the current time.
    pub fn put(&self, intraday: Vec<Setup>, swing: Vec<Setup>, news: Vec<Article>) {
        self.store.save(SignalSnapshot {
            intraday,
            swing,
            news,
            last_updated: self.clock.now(),
        });
    }

    /// Clock accessor for callers that need a consistent timestamp.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Clock that only moves when told to.
    struct FakeClock {
        epoch_secs: AtomicI64,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                epoch_secs: AtomicI64::new(1_700_000_000),
            }
        }

        fn advance(&self, secs: i64) {
            self.epoch_secs.fetch_add(secs, Ordering::SeqCst);
        }
    }

    impl Clock for &'static FakeClock {
        fn now(&self) -> DateTime<Utc> {
            chrono::TimeZone::timestamp_opt(&Utc, self.epoch_secs.load(Ordering::SeqCst), 0)
                .single()
                .unwrap_or_else(Utc::now)
        }
    }

    fn leak_clock() -> &'static FakeClock {
        Box::leak(Box::new(FakeClock::new()))
    }

    #[test]
    fn test_empty_to_fresh_to_stale() {
        let clock = leak_clock();
        let cache = SignalCache::with_parts(Box::new(MemoryStore::new()), Box::new(clock), 3600);

        assert_eq!(cache.state(), CacheState::Empty);
        assert!(cache.get_fresh().is_none());

        cache.put(Vec::new(), Vec::new(), Vec::new());
        assert_eq!(cache.state(), CacheState::Fresh);
        assert!(cache.get_fresh().is_some());

        clock.advance(3599);
        assert_eq!(cache.state(), CacheState::Fresh);

        clock.advance(2);
        assert_eq!(cache.state(), CacheState::Stale);
        assert!(cache.get_fresh().is_none());
        // Stale snapshots stay servable.
        assert!(cache.get_any().is_some());
    }

    #[test]
    fn test_put_refreshes_ttl() {
        let clock = leak_clock();
        let cache = SignalCache::with_parts(Box::new(MemoryStore::new()), Box::new(clock), 60);

        cache.put(Vec::new(), Vec::new(), Vec::new());
        clock.advance(120);
        assert_eq!(cache.state(), CacheState::Stale);

        cache.put(Vec::new(), Vec::new(), Vec::new());
        assert_eq!(cache.state(), CacheState::Fresh);
    }
}
