//! Async query cache keyed by endpoint + parameters.
//!
//! Concurrent reads of one key share a single in-flight request. Every fetch
//! gets a generation number; a response is committed only if no newer fetch or
//! invalidation happened since it started, so a slow stale response can never
//! overwrite newer state. Invalidation marks entries stale and notifies live
//! observers, which refetch.

pub mod mutation;
pub mod observer;

pub use mutation::Mutation;
pub use observer::{Loadable, QueryObserver, QueryState, RefetchPolicy};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::api::{Backend, QueryParams};
use crate::error::ClientError;

/// Identity of a cached read: the invalidation scope it belongs to plus the
/// exact endpoint and parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub scope: &'static str,
    pub path: String,
    pub params: QueryParams,
}

impl QueryKey {
    pub fn new(scope: &'static str, path: impl Into<String>) -> Self {
        Self {
            scope,
            path: path.into(),
            params: QueryParams::new(),
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }
}

/// Notifications fanned out to observers.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Invalidated(QueryKey),
    Committed(QueryKey),
    Cleared,
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Value>, ClientError>>>;

#[derive(Default)]
struct Entry {
    data: Option<Arc<Value>>,
    error: Option<ClientError>,
    updated_at: Option<Instant>,
    stale: bool,
    /// Generation of the newest fetch (or invalidation) for this key.
    generation: u64,
    inflight: Option<(u64, SharedFetch)>,
}

/// Point-in-time view of one key.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub data: Option<Arc<Value>>,
    pub error: Option<ClientError>,
    pub fetching: bool,
    pub stale: bool,
}

struct CacheInner {
    backend: Arc<dyn Backend>,
    entries: Mutex<HashMap<QueryKey, Entry>>,
    events: broadcast::Sender<CacheEvent>,
    stale_after: Duration,
}

/// Cheap-to-clone handle; all clones share one cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

impl QueryCache {
    pub fn new(backend: Arc<dyn Backend>, stale_after: Duration) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(CacheInner {
                backend,
                entries: Mutex::new(HashMap::new()),
                events,
                stale_after,
            }),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.inner.backend
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Return fresh cached data, join an in-flight request for the key, or
    /// start a new one.
    pub async fn fetch(&self, key: &QueryKey) -> Result<Arc<Value>, ClientError> {
        let fut = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(key.clone()).or_default();

            if let Some(data) = self.fresh_data(entry) {
                return Ok(data);
            }

            match &entry.inflight {
                Some((_, fut)) => fut.clone(),
                None => {
                    entry.generation += 1;
                    let fut = self.start_fetch(key.clone(), entry.generation);
                    entry.inflight = Some((entry.generation, fut.clone()));
                    fut
                }
            }
        };
        fut.await
    }

    /// Always issue a new request, superseding any in-flight one.
    pub async fn refetch(&self, key: &QueryKey) -> Result<Arc<Value>, ClientError> {
        let fut = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(key.clone()).or_default();
            entry.generation += 1;
            let fut = self.start_fetch(key.clone(), entry.generation);
            entry.inflight = Some((entry.generation, fut.clone()));
            fut
        };
        fut.await
    }

    fn fresh_data(&self, entry: &Entry) -> Option<Arc<Value>> {
        if entry.stale || entry.error.is_some() {
            return None;
        }
        let updated_at = entry.updated_at?;
        if updated_at.elapsed() < self.inner.stale_after {
            entry.data.clone()
        } else {
            None
        }
    }

    fn start_fetch(&self, key: QueryKey, generation: u64) -> SharedFetch {
        let inner = Arc::clone(&self.inner);
        async move {
            let result = inner
                .backend
                .get(&key.path, &key.params)
                .await
                .map(Arc::new);
            commit(&inner, &key, generation, &result);
            result
        }
        .boxed()
        .shared()
    }

    /// Mark every key in `scope` stale and tell observers to refetch.
    pub fn invalidate(&self, scope: &str) {
        let keys: Vec<QueryKey> = {
            let mut entries = self.inner.entries.lock();
            entries
                .iter_mut()
                .filter(|(k, _)| k.scope == scope)
                .map(|(k, entry)| {
                    mark_stale(entry);
                    k.clone()
                })
                .collect()
        };
        log::debug!("QueryCache: invalidated {} key(s) in '{}'", keys.len(), scope);
        for key in keys {
            let _ = self.inner.events.send(CacheEvent::Invalidated(key));
        }
    }

    /// Mark one exact key stale.
    pub fn invalidate_key(&self, key: &QueryKey) {
        let found = {
            let mut entries = self.inner.entries.lock();
            match entries.get_mut(key) {
                Some(entry) => {
                    mark_stale(entry);
                    true
                }
                None => false,
            }
        };
        if found {
            let _ = self.inner.events.send(CacheEvent::Invalidated(key.clone()));
        }
    }

    /// Drop everything (logout).
    pub fn clear(&self) {
        self.inner.entries.lock().clear();
        log::info!("QueryCache: cleared");
        let _ = self.inner.events.send(CacheEvent::Cleared);
    }

    /// Number of keys with a request still outstanding.
    pub fn pending_fetches(&self) -> usize {
        self.inner
            .entries
            .lock()
            .values()
            .filter(|entry| entry.inflight.is_some())
            .count()
    }

    pub fn snapshot(&self, key: &QueryKey) -> Snapshot {
        let entries = self.inner.entries.lock();
        match entries.get(key) {
            Some(entry) => Snapshot {
                data: entry.data.clone(),
                error: entry.error.clone(),
                fetching: entry.inflight.is_some(),
                stale: entry.stale,
            },
            None => Snapshot::default(),
        }
    }
}

/// An invalidation supersedes in-flight requests: their responses predate the
/// write that triggered it.
fn mark_stale(entry: &mut Entry) {
    entry.stale = true;
    entry.generation += 1;
    entry.inflight = None;
}

fn commit(
    inner: &CacheInner,
    key: &QueryKey,
    generation: u64,
    result: &Result<Arc<Value>, ClientError>,
) {
    {
        let mut entries = inner.entries.lock();
        let Some(entry) = entries.get_mut(key) else {
            log::debug!("QueryCache: dropping response for cleared key {}", key.path);
            return;
        };
        if entry.generation != generation {
            log::debug!(
                "QueryCache: discarding stale response for {} (gen {} < {})",
                key.path,
                generation,
                entry.generation
            );
            return;
        }
        entry.inflight = None;
        match result {
            Ok(data) => {
                entry.data = Some(Arc::clone(data));
                entry.error = None;
                entry.updated_at = Some(Instant::now());
                entry.stale = false;
            }
            Err(e) => {
                log::warn!("QueryCache: fetch {} failed: {}", key.path, e);
                entry.error = Some(e.clone());
            }
        }
    }
    let _ = inner.events.send(CacheEvent::Committed(key.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use serde_json::json;

    fn cache_with(backend: &Arc<FakeBackend>) -> QueryCache {
        QueryCache::new(backend.clone(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_request() {
        let backend = Arc::new(FakeBackend::new().with_latency(Duration::from_millis(20)));
        backend.respond("GET /api/signals", json!({"signals": [], "total": 0}));
        let cache = cache_with(&backend);
        let key = QueryKey::new("signals", "/api/signals")
            .with_params(QueryParams::new().with("status", "new"));

        let (a, b) = tokio::join!(cache.fetch(&key), cache.fetch(&key));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(backend.call_count("GET /api/signals"), 1);
    }

    #[tokio::test]
    async fn test_pending_fetches_tracks_outstanding_requests() {
        let backend = Arc::new(FakeBackend::new().with_latency(Duration::from_millis(20)));
        backend.respond("GET /api/deals", json!({"deals": []}));
        let cache = cache_with(&backend);
        let key = QueryKey::new("deals", "/api/deals");
        assert_eq!(cache.pending_fetches(), 0);

        let task = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.fetch(&key).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.pending_fetches(), 1);
        task.await.unwrap().unwrap();
        assert_eq!(cache.pending_fetches(), 0);
    }

    #[tokio::test]
    async fn test_distinct_params_are_distinct_keys() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /api/signals", json!({"signals": []}));
        let cache = cache_with(&backend);
        let new = QueryKey::new("signals", "/api/signals")
            .with_params(QueryParams::new().with("status", "new"));
        let reviewed = QueryKey::new("signals", "/api/signals")
            .with_params(QueryParams::new().with("status", "reviewed"));

        cache.fetch(&new).await.unwrap();
        cache.fetch(&reviewed).await.unwrap();
        assert_eq!(backend.call_count("GET /api/signals"), 2);
    }

    #[tokio::test]
    async fn test_fresh_data_served_from_cache() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /api/entities/stats", json!({"total": 4}));
        let cache = QueryCache::new(backend.clone(), Duration::from_secs(60));
        let key = QueryKey::new("entity-stats", "/api/entities/stats");

        cache.fetch(&key).await.unwrap();
        cache.fetch(&key).await.unwrap();
        assert_eq!(backend.call_count("GET /api/entities/stats"), 1);

        cache.invalidate("entity-stats");
        assert!(cache.snapshot(&key).stale);
        cache.fetch(&key).await.unwrap();
        assert_eq!(backend.call_count("GET /api/entities/stats"), 2);
    }

    #[tokio::test]
    async fn test_failure_is_distinct_from_loading_and_empty() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail("GET /api/news", ClientError::Network("connection refused".into()));
        let cache = cache_with(&backend);
        let key = QueryKey::new("news", "/api/news");

        assert!(cache.fetch(&key).await.is_err());
        let snap = cache.snapshot(&key);
        assert!(snap.data.is_none());
        assert!(!snap.fetching);
        assert!(matches!(snap.error, Some(ClientError::Network(_))));
    }

    #[tokio::test]
    async fn test_invalidation_discards_inflight_response() {
        let backend = Arc::new(FakeBackend::new().with_latency(Duration::from_millis(30)));
        backend.respond_seq(
            "GET /api/battle-cards",
            vec![
                json!({"battle_cards": [{"id": 1, "status": "draft"}]}),
                json!({"battle_cards": [{"id": 1, "status": "approved"}]}),
            ],
        );
        let cache = cache_with(&backend);
        let key = QueryKey::new("battle-cards", "/api/battle-cards");

        let slow = {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.fetch(&key).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.invalidate("battle-cards");
        let fresh = cache.fetch(&key).await.unwrap();
        slow.await.unwrap().unwrap();

        assert_eq!(fresh["battle_cards"][0]["status"], "approved");
        let snap = cache.snapshot(&key);
        assert_eq!(snap.data.unwrap()["battle_cards"][0]["status"], "approved");
    }

    #[tokio::test]
    async fn test_invalidate_broadcasts_only_matching_scope() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /api/deals", json!({"deals": []}));
        backend.respond("GET /api/people", json!({"people": []}));
        let cache = cache_with(&backend);
        let deals = QueryKey::new("deals", "/api/deals");
        let people = QueryKey::new("people", "/api/people");
        cache.fetch(&deals).await.unwrap();
        cache.fetch(&people).await.unwrap();

        let mut events = cache.subscribe();
        cache.invalidate("deals");
        assert_eq!(events.recv().await.unwrap(), CacheEvent::Invalidated(deals));
        assert!(events.try_recv().is_err());
        assert!(!cache.snapshot(&people).stale);
    }

    #[tokio::test]
    async fn test_clear_forgets_everything() {
        let backend = Arc::new(FakeBackend::new());
        backend.respond("GET /api/digests", json!({"digests": []}));
        let cache = cache_with(&backend);
        let key = QueryKey::new("digests", "/api/digests");
        cache.fetch(&key).await.unwrap();

        cache.clear();
        assert!(cache.snapshot(&key).data.is_none());
    }
}
