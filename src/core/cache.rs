use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(60 * 60);

struct CacheEntry<T> {
    snapshot: Arc<T>,
    fetched_at: Instant,
}

/// Time-boxed cache holding one full dataset per provider.
///
/// Entries are never merged: `put` replaces the provider's slot wholesale and
/// an entry older than the TTL is treated as absent. The lock is only held
/// for the map access, so two lookups racing on a stale slot both refetch;
/// the later write simply wins.
pub struct SnapshotCache<T>
where
    T: Send + Sync + 'static,
{
    ttl: Duration,
    inner: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T> SnapshotCache<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, provider: &str) -> Option<Arc<T>> {
        let cache = self.inner.lock().await;
        match cache.get(provider) {
            Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                debug!("Snapshot cache HIT for provider: {}", provider);
                Some(Arc::clone(&entry.snapshot))
            }
            Some(_) => {
                debug!("Snapshot cache entry expired for provider: {}", provider);
                None
            }
            None => {
                debug!("Snapshot cache MISS for provider: {}", provider);
                None
            }
        }
    }

    /// Stores `snapshot` as the provider's current dataset and returns it.
    pub async fn put(&self, provider: &str, snapshot: T) -> Arc<T> {
        let snapshot = Arc::new(snapshot);
        let mut cache = self.inner.lock().await;
        debug!("Snapshot cache PUT for provider: {}", provider);
        cache.insert(
            provider.to_string(),
            CacheEntry {
                snapshot: Arc::clone(&snapshot),
                fetched_at: Instant::now(),
            },
        );
        snapshot
    }
}

impl<T> Default for SnapshotCache<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT_TTL)
    }
}
