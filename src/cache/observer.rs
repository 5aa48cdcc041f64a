//! A live subscription to one cache key.
//!
//! The observer owns a background task that reads the key on mount, refetches
//! on invalidation or on its polling schedule, and publishes every change on a
//! watch channel. Dropping the observer aborts the task, so an unmounted page
//! stops polling immediately.

use std::fmt;
use std::future::pending;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use super::{CacheEvent, QueryCache, QueryKey};
use crate::error::ClientError;
use crate::types::GenerationStatus;

/// When an observer refetches on its own.
#[derive(Clone, Default)]
pub enum RefetchPolicy {
    #[default]
    Never,
    Every(Duration),
    /// Interval computed from the last result; `None` stops polling until the
    /// next invalidation or manual refetch.
    When(Arc<dyn Fn(&Value) -> Option<Duration> + Send + Sync>),
}

impl RefetchPolicy {
    /// Poll at `interval` while the record's `generation_status` is pending or
    /// in progress.
    pub fn while_generating(interval: Duration) -> Self {
        RefetchPolicy::When(Arc::new(move |value| {
            let status = value
                .get("generation_status")
                .and_then(|s| s.as_str())
                .map(GenerationStatus::parse)?;
            status.is_running().then_some(interval)
        }))
    }

    fn next_delay(&self, data: Option<&Value>) -> Option<Duration> {
        match self {
            RefetchPolicy::Never => None,
            RefetchPolicy::Every(interval) => Some(*interval),
            RefetchPolicy::When(f) => data.and_then(|v| f(v)),
        }
    }
}

impl fmt::Debug for RefetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefetchPolicy::Never => write!(f, "Never"),
            RefetchPolicy::Every(d) => write!(f, "Every({:?})", d),
            RefetchPolicy::When(_) => write!(f, "When(..)"),
        }
    }
}

/// Raw state published by an observer task.
#[derive(Debug, Clone, Default)]
pub struct QueryState {
    pub data: Option<Arc<Value>>,
    pub error: Option<ClientError>,
    pub fetching: bool,
}

impl QueryState {
    /// Loaded or failed; no longer in the initial loading phase.
    pub fn is_settled(&self) -> bool {
        !self.fetching && (self.data.is_some() || self.error.is_some())
    }
}

/// Typed tri-state of a query as seen by a view.
#[derive(Debug, Clone)]
pub enum Loadable<T> {
    /// The query is disabled (nothing selected).
    Idle,
    Loading,
    Failed(ClientError),
    Ready(T),
}

impl<T> Loadable<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Loadable::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            Loadable::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Loadable<U> {
        match self {
            Loadable::Idle => Loadable::Idle,
            Loadable::Loading => Loadable::Loading,
            Loadable::Failed(e) => Loadable::Failed(e),
            Loadable::Ready(v) => Loadable::Ready(f(v)),
        }
    }
}

pub struct QueryObserver<T> {
    key: QueryKey,
    state: watch::Receiver<QueryState>,
    refetch: Arc<Notify>,
    task: JoinHandle<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> QueryObserver<T> {
    /// Start observing `key`. Must be called inside a tokio runtime.
    pub fn new(cache: &QueryCache, key: QueryKey, policy: RefetchPolicy) -> Self {
        let (tx, rx) = watch::channel(QueryState {
            fetching: true,
            ..cache_state(cache, &key)
        });
        let refetch = Arc::new(Notify::new());
        let task = tokio::spawn(run_observer(
            cache.clone(),
            key.clone(),
            policy,
            tx,
            Arc::clone(&refetch),
        ));
        Self {
            key,
            state: rx,
            refetch,
            task,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn state(&self) -> QueryState {
        self.state.borrow().clone()
    }

    /// Decode the current data. Data already loaded stays visible while a
    /// refetch is running or after a later refetch failed.
    pub fn current(&self) -> Loadable<T> {
        let state = self.state.borrow();
        match (&state.data, &state.error) {
            (Some(data), _) => match T::deserialize(data.as_ref()) {
                Ok(v) => Loadable::Ready(v),
                Err(e) => Loadable::Failed(ClientError::from(e)),
            },
            (None, Some(err)) => Loadable::Failed(err.clone()),
            (None, None) => Loadable::Loading,
        }
    }

    /// Receiver of raw state changes, for tasks that derive data from this
    /// query.
    pub fn watch(&self) -> watch::Receiver<QueryState> {
        self.state.clone()
    }

    /// Ask for an immediate refetch.
    pub fn refetch(&self) {
        self.refetch.notify_one();
    }

    /// Wait for the next published change.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }

    /// Wait until the query has loaded or failed.
    pub async fn settled(&mut self) -> Loadable<T> {
        let _ = self.state.wait_for(QueryState::is_settled).await;
        self.current()
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn cache_state(cache: &QueryCache, key: &QueryKey) -> QueryState {
    let snap = cache.snapshot(key);
    QueryState {
        data: snap.data,
        error: snap.error,
        fetching: snap.fetching,
    }
}

async fn run_observer(
    cache: QueryCache,
    key: QueryKey,
    policy: RefetchPolicy,
    tx: watch::Sender<QueryState>,
    refetch: Arc<Notify>,
) {
    let mut events = cache.subscribe();

    loop {
        tx.send_modify(|s| s.fetching = true);
        let _ = cache.fetch(&key).await;
        let state = cache_state(&cache, &key);
        let deadline = policy
            .next_delay(state.data.as_deref())
            .map(|d| Instant::now() + d);
        match deadline {
            Some(_) => log::debug!("QueryObserver: {} polls again per {:?}", key.path, policy),
            None => log::debug!("QueryObserver: {} idle until invalidated", key.path),
        }
        tx.send_replace(QueryState {
            fetching: false,
            ..state
        });

        // Wait for the next reason to refetch.
        loop {
            let sleep = async {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => pending::<()>().await,
                }
            };
            tokio::select! {
                _ = sleep => break,
                _ = refetch.notified() => break,
                event = events.recv() => match event {
                    Ok(CacheEvent::Invalidated(k)) if k == key => break,
                    Ok(CacheEvent::Cleared) => break,
                    Ok(CacheEvent::Committed(k)) if k == key => {
                        let state = cache_state(&cache, &key);
                        tx.send_replace(QueryState { fetching: false, ..state });
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::debug!("QueryObserver: lagged {} events, refetching {}", n, key.path);
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use crate::api::QueryParams;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Status {
        generation_status: String,
    }

    fn setup() -> (Arc<FakeBackend>, QueryCache) {
        let backend = Arc::new(FakeBackend::new());
        let cache = QueryCache::new(backend.clone(), Duration::ZERO);
        (backend, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_conditional_polling_stops_when_completed() {
        let (backend, cache) = setup();
        backend.respond_seq(
            "GET /api/dossiers/7",
            vec![
                json!({"id": 7, "generation_status": "pending"}),
                json!({"id": 7, "generation_status": "in_progress"}),
                json!({"id": 7, "generation_status": "completed"}),
            ],
        );
        let key = QueryKey::new("dossier", "/api/dossiers/7");
        let mut obs: QueryObserver<Status> =
            QueryObserver::new(&cache, key, RefetchPolicy::while_generating(Duration::from_secs(5)));

        let first = obs.settled().await;
        assert_eq!(first.ready().unwrap().generation_status, "pending");

        tokio::time::sleep(Duration::from_secs(11)).await;
        let status = obs.current().into_ready().unwrap().generation_status;
        assert_eq!(status, "completed");
        assert_eq!(backend.call_count("GET /api/dossiers/7"), 3);

        // Completed: no further requests.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.call_count("GET /api/dossiers/7"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_stops_polling() {
        let (backend, cache) = setup();
        backend.respond_seq(
            "GET /api/dossiers/8",
            vec![
                json!({"id": 8, "generation_status": "in_progress"}),
                json!({"id": 8, "generation_status": "failed"}),
            ],
        );
        let key = QueryKey::new("dossier", "/api/dossiers/8");
        let mut obs: QueryObserver<Status> =
            QueryObserver::new(&cache, key, RefetchPolicy::while_generating(Duration::from_secs(5)));
        obs.settled().await;

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.call_count("GET /api/dossiers/8"), 2);
        assert_eq!(obs.current().into_ready().unwrap().generation_status, "failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_interval_polling_and_drop_stops_it() {
        let (backend, cache) = setup();
        backend.respond("GET /api/signals", json!({"signals": []}));
        let key = QueryKey::new("signals", "/api/signals")
            .with_params(QueryParams::new().with("status", "new"));
        let mut obs: QueryObserver<Value> =
            QueryObserver::new(&cache, key, RefetchPolicy::Every(Duration::from_secs(30)));
        obs.settled().await;

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(backend.call_count("GET /api/signals"), 3);

        drop(obs);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(backend.call_count("GET /api/signals"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidation_triggers_refetch() {
        let (backend, cache) = setup();
        backend.respond_seq(
            "GET /api/battle-cards",
            vec![
                json!({"battle_cards": [{"id": 1, "status": "draft"}]}),
                json!({"battle_cards": [{"id": 1, "status": "approved"}]}),
            ],
        );
        let key = QueryKey::new("battle-cards", "/api/battle-cards");
        let mut obs: QueryObserver<Value> = QueryObserver::new(&cache, key, RefetchPolicy::Never);
        obs.settled().await;

        cache.invalidate("battle-cards");
        while obs.current().ready().map(|v| v["battle_cards"][0]["status"] != "approved").unwrap_or(true) {
            assert!(obs.changed().await);
        }
        assert_eq!(backend.call_count("GET /api/battle-cards"), 2);
    }

    #[tokio::test]
    async fn test_error_state_is_failed_not_loading() {
        let (backend, cache) = setup();
        backend.fail("GET /api/people", ClientError::Http { status: 500, message: "boom".into() });
        let key = QueryKey::new("people", "/api/people");
        let mut obs: QueryObserver<Value> = QueryObserver::new(&cache, key, RefetchPolicy::Never);
        assert!(matches!(obs.settled().await, Loadable::Failed(ClientError::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_manual_refetch() {
        let (backend, cache) = setup();
        backend.respond("GET /api/news", json!({"news": []}));
        let key = QueryKey::new("news", "/api/news");
        let mut obs: QueryObserver<Value> = QueryObserver::new(&cache, key, RefetchPolicy::Never);
        obs.settled().await;

        obs.refetch();
        while backend.call_count("GET /api/news") < 2 {
            obs.changed().await;
        }
        assert_eq!(backend.call_count("GET /api/news"), 2);
    }
}
