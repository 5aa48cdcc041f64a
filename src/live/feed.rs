//! Scoped subscription to a server-sent event stream.
//!
//! Each decoded event is parsed as JSON and prepended to a bounded buffer.
//! Malformed events are dropped without closing the stream. When the stream
//! ends or fails the feed reconnects after a delay (the server's `retry` hint
//! wins). Dropping the feed closes the connection.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{LiveBuffer, SseDecoder};
use crate::api::Backend;

pub struct LiveFeed<T> {
    buffer: Arc<Mutex<LiveBuffer<T>>>,
    revisions: Arc<watch::Sender<u64>>,
    enabled: watch::Sender<bool>,
    task: JoinHandle<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LiveFeed<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Open `path` and keep it open until the feed is dropped.
    pub fn subscribe(
        backend: Arc<dyn Backend>,
        path: &str,
        capacity: usize,
        reconnect: Duration,
    ) -> Self {
        let buffer = Arc::new(Mutex::new(LiveBuffer::new(capacity)));
        let (revisions, _) = watch::channel(0u64);
        let revisions = Arc::new(revisions);
        let (enabled, enabled_rx) = watch::channel(true);

        let task = tokio::spawn(run_feed::<T>(
            backend,
            path.to_string(),
            Arc::clone(&buffer),
            Arc::clone(&revisions),
            enabled_rx,
            reconnect,
        ));

        Self {
            buffer,
            revisions,
            enabled,
            task,
            _marker: PhantomData,
        }
    }

    /// Pause or resume the subscription. Disabling closes the connection;
    /// the buffer keeps its contents.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.send_if_modified(|current| {
            let changed = *current != enabled;
            *current = enabled;
            changed
        });
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Replace the buffer contents (newest-first).
    pub fn seed(&self, items: impl IntoIterator<Item = T>) {
        self.seeder().seed(items);
    }

    /// Handle that can reseed the buffer from another task.
    pub fn seeder(&self) -> FeedSeeder<T> {
        FeedSeeder {
            buffer: Arc::clone(&self.buffer),
            revisions: Arc::clone(&self.revisions),
        }
    }

    pub fn revision(&self) -> u64 {
        self.buffer.lock().revision()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Receiver that fires on every buffer change.
    pub fn watch_revisions(&self) -> watch::Receiver<u64> {
        self.revisions.subscribe()
    }

    pub fn buffer(&self) -> Arc<Mutex<LiveBuffer<T>>> {
        Arc::clone(&self.buffer)
    }

    /// Wait until the buffer changes.
    pub async fn changed(&self) {
        let mut rx = self.revisions.subscribe();
        let _ = rx.changed().await;
    }
}

impl<T: Clone> LiveFeed<T> {
    pub fn items(&self) -> Vec<T> {
        self.buffer.lock().to_vec()
    }
}

pub struct FeedSeeder<T> {
    buffer: Arc<Mutex<LiveBuffer<T>>>,
    revisions: Arc<watch::Sender<u64>>,
}

impl<T> Clone for FeedSeeder<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            revisions: Arc::clone(&self.revisions),
        }
    }
}

impl<T> FeedSeeder<T> {
    pub fn seed(&self, items: impl IntoIterator<Item = T>) {
        let revision = {
            let mut buffer = self.buffer.lock();
            buffer.seed(items);
            buffer.revision()
        };
        self.revisions.send_replace(revision);
    }
}

impl<T> Drop for LiveFeed<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_feed<T: DeserializeOwned>(
    backend: Arc<dyn Backend>,
    path: String,
    buffer: Arc<Mutex<LiveBuffer<T>>>,
    revisions: Arc<watch::Sender<u64>>,
    mut enabled: watch::Receiver<bool>,
    reconnect: Duration,
) {
    let mut delay = reconnect;

    loop {
        if enabled.wait_for(|on| *on).await.is_err() {
            return;
        }

        let mut stream = match backend.open_stream(&path).await {
            Ok(stream) => {
                log::info!("LiveFeed: connected to {}", path);
                stream
            }
            Err(e) => {
                log::warn!("LiveFeed: failed to connect to {}: {}", path, e);
                wait_or_disabled(delay, &mut enabled).await;
                continue;
            }
        };

        let mut decoder = SseDecoder::new();
        loop {
            tokio::select! {
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for event in decoder.feed(&bytes) {
                            if let Some(retry) = event.retry {
                                delay = retry;
                            }
                            if event.data.is_empty() {
                                continue;
                            }
                            match serde_json::from_str::<T>(&event.data) {
                                Ok(item) => {
                                    let revision = {
                                        let mut buffer = buffer.lock();
                                        buffer.push(item);
                                        buffer.revision()
                                    };
                                    revisions.send_replace(revision);
                                }
                                Err(e) => {
                                    log::debug!("LiveFeed: dropping malformed event on {}: {}", path, e);
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        log::warn!("LiveFeed: stream {} failed: {}", path, e);
                        break;
                    }
                    None => {
                        log::info!("LiveFeed: stream {} closed by server", path);
                        break;
                    }
                },
                res = enabled.changed() => {
                    if res.is_err() {
                        return;
                    }
                    if !*enabled.borrow() {
                        log::info!("LiveFeed: disabled, closing {}", path);
                        break;
                    }
                }
            }
        }
        drop(stream);

        if *enabled.borrow() {
            wait_or_disabled(delay, &mut enabled).await;
        }
    }
}

/// Sleep for the reconnect delay, cut short if the feed is disabled.
async fn wait_or_disabled(delay: Duration, enabled: &mut watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = enabled.wait_for(|on| !*on) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_utils::FakeBackend;
    use crate::types::NewsItem;
    use serde_json::json;

    async fn wait_for_len<T: DeserializeOwned + Send + 'static>(feed: &LiveFeed<T>, len: usize) {
        let mut rx = feed.watch_revisions();
        while feed.len() < len {
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_events_prepend_and_malformed_dropped() {
        let backend = Arc::new(FakeBackend::new());
        let stream = backend.push_stream("/api/news/live");
        let feed: LiveFeed<NewsItem> =
            LiveFeed::subscribe(backend.clone(), "/api/news/live", 10, Duration::from_secs(3));

        stream.send_data(&json!({"headline": "First"}));
        stream.send_raw("data: {not json\n\n");
        stream.send_data(&json!({"headline": "Second"}));
        wait_for_len(&feed, 2).await;

        let items = feed.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].headline, "Second");
        assert_eq!(items[1].headline, "First");
    }

    #[tokio::test]
    async fn test_buffer_capacity_bounds_live_items() {
        let backend = Arc::new(FakeBackend::new());
        let stream = backend.push_stream("/api/news/live");
        let feed: LiveFeed<NewsItem> =
            LiveFeed::subscribe(backend.clone(), "/api/news/live", 3, Duration::from_secs(3));

        for i in 0..8 {
            stream.send_data(&json!({ "headline": format!("h{}", i) }));
        }
        let mut rx = feed.watch_revisions();
        while feed.revision() < 8 {
            rx.changed().await.unwrap();
        }
        assert_eq!(feed.len(), 3);
        assert_eq!(feed.items()[0].headline, "h7");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_after_stream_error() {
        let backend = Arc::new(FakeBackend::new());
        let first = backend.push_stream("/api/news/live");
        let second = backend.push_stream("/api/news/live");
        let feed: LiveFeed<NewsItem> =
            LiveFeed::subscribe(backend.clone(), "/api/news/live", 10, Duration::from_secs(3));

        first.send_error("connection reset");
        second.send_data(&json!({"headline": "after reconnect"}));
        wait_for_len(&feed, 1).await;

        assert_eq!(backend.call_count("STREAM /api/news/live"), 2);
        assert_eq!(feed.items()[0].headline, "after reconnect");
    }

    #[tokio::test]
    async fn test_seed_bumps_revision() {
        let backend = Arc::new(FakeBackend::new());
        let _stream = backend.push_stream("/api/news/live");
        let feed: LiveFeed<NewsItem> =
            LiveFeed::subscribe(backend.clone(), "/api/news/live", 50, Duration::from_secs(3));
        let mut rx = feed.watch_revisions();

        feed.seed(vec![NewsItem {
            headline: "seeded".into(),
            ..Default::default()
        }]);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
        assert_eq!(feed.items()[0].headline, "seeded");
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_feed_does_not_connect() {
        let backend = Arc::new(FakeBackend::new());
        let _stream = backend.push_stream("/api/news/live");
        let feed: LiveFeed<NewsItem> =
            LiveFeed::subscribe(backend.clone(), "/api/news/live", 10, Duration::from_secs(3));
        feed.set_enabled(false);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!feed.is_enabled());
        assert!(backend.call_count("STREAM /api/news/live") <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reenabling_reopens_the_stream() {
        let backend = Arc::new(FakeBackend::new());
        let first = backend.push_stream("/api/news/live");
        let second = backend.push_stream("/api/news/live");
        let feed: LiveFeed<NewsItem> =
            LiveFeed::subscribe(backend.clone(), "/api/news/live", 10, Duration::from_secs(3));

        first.send_data(&json!({"headline": "before pause"}));
        wait_for_len(&feed, 1).await;

        feed.set_enabled(false);
        tokio::time::sleep(Duration::from_secs(10)).await;
        first.send_data(&json!({"headline": "while paused"}));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.call_count("STREAM /api/news/live"), 1);
        assert_eq!(feed.len(), 1);

        feed.set_enabled(true);
        second.send_data(&json!({"headline": "after resume"}));
        wait_for_len(&feed, 2).await;

        assert_eq!(backend.call_count("STREAM /api/news/live"), 2);
        let items = feed.items();
        assert_eq!(items[0].headline, "after resume");
        assert_eq!(items[1].headline, "before pause");
    }
}
