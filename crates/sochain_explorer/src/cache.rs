//! In-memory TTL cache for display records, with a periodic sweep and per-key single-flight.

use crate::chain::{DisplayBlock, DisplayTransaction, Network};
use crate::telemetry::{LogEvent, LogSink};
use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::Level;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// Shorter sweep intervals, zero included, are raised to this.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Cache key namespaced by record kind, so a block id can never collide with a tx hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Block { network: Network, id: String },
    Transaction { network: Network, hash: String },
}

impl CacheKey {
    pub fn block(network: Network, id: impl Into<String>) -> Self {
        CacheKey::Block {
            network,
            id: id.into(),
        }
    }

    pub fn transaction(network: Network, hash: impl Into<String>) -> Self {
        CacheKey::Transaction {
            network,
            hash: hash.into(),
        }
    }

    pub fn network(&self) -> Network {
        match self {
            CacheKey::Block { network, .. } | CacheKey::Transaction { network, .. } => *network,
        }
    }

    /// Block number/hash or transaction hash.
    pub fn id(&self) -> &str {
        match self {
            CacheKey::Block { id, .. } => id,
            CacheKey::Transaction { hash, .. } => hash,
        }
    }

    fn lookup_event(&self, hit: bool) -> LogEvent<'_> {
        let message = match (self, hit) {
            (CacheKey::Block { .. }, true) => "block cache hit",
            (CacheKey::Block { .. }, false) => "block cache miss",
            (CacheKey::Transaction { .. }, true) => "tx cache hit",
            (CacheKey::Transaction { .. }, false) => "tx cache miss",
        };
        LogEvent::new(message).network(self.network()).id(self.id())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Block { network, id } => write!(f, "block:{}_{}", network, id),
            CacheKey::Transaction { network, hash } => write!(f, "tx:{}_{}", network, hash),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CachedRecord {
    Block(Arc<DisplayBlock>),
    Transaction(Arc<DisplayTransaction>),
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) > ttl
    }
}

/// Concurrent TTL cache. Values are cloned out on read; store `Arc`s for large records.
pub struct RecordCache<V = CachedRecord> {
    entries: DashMap<CacheKey, Entry<V>>,
    inflight: DashMap<CacheKey, Arc<OnceCell<V>>>,
    ttl: Duration,
    log: Arc<dyn LogSink>,
}

impl<V> RecordCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: &CacheConfig, log: Arc<dyn LogSink>) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            ttl: config.ttl,
            log,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live value for `key`. Expired entries are dropped on the way out.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now, self.ttl) {
                return Some(entry.value.clone());
            }
        }
        self.entries
            .remove_if(key, |_, e| e.is_expired(now, self.ttl));
        None
    }

    /// Inserts or overwrites; the TTL restarts from now.
    pub fn set(&self, key: CacheKey, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Removes every expired entry. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now, self.ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serves `key` from the cache, or runs `fetch` and stores its value.
    ///
    /// Concurrent callers on the same cold key wait for a single `fetch`. Errors are
    /// returned to the caller that produced them and are never cached; the next waiter
    /// then runs its own `fetch`.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &CacheKey, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(v) = self.get(key) {
            self.log.record(Level::DEBUG, key.lookup_event(true));
            return Ok(v);
        }

        let cell = Arc::clone(&*self.inflight.entry(key.clone()).or_default());
        let _guard = InflightGuard {
            inflight: &self.inflight,
            key,
            cell: &cell,
        };
        let value = cell
            .get_or_try_init(|| async move {
                // An earlier flight on this key may have finished while we queued.
                if let Some(v) = self.get(key) {
                    return Ok(v);
                }
                self.log.record(Level::DEBUG, key.lookup_event(false));
                let v = fetch().await?;
                self.set(key.clone(), v.clone());
                Ok::<V, E>(v)
            })
            .await?;
        Ok(value.clone())
    }

    /// Sweeps every `every` (at least [`MIN_SWEEP_INTERVAL`]) until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let every = every.max(MIN_SWEEP_INTERVAL);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.sweep();
                if removed > 0 {
                    cache.log.record(
                        Level::DEBUG,
                        LogEvent::new("swept expired cache entries").count(removed),
                    );
                }
            }
        })
    }
}

/// Drops the in-flight marker for `key` however the flight ends, including cancellation.
struct InflightGuard<'a, V> {
    inflight: &'a DashMap<CacheKey, Arc<OnceCell<V>>>,
    key: &'a CacheKey,
    cell: &'a Arc<OnceCell<V>>,
}

impl<V> Drop for InflightGuard<'_, V> {
    fn drop(&mut self) {
        self.inflight
            .remove_if(self.key, |_, c| Arc::ptr_eq(c, self.cell));
    }
}
