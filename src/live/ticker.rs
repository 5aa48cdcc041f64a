//! Rotating single-headline display over a live buffer.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::LiveBuffer;

/// Index of the headline currently shown.
///
/// Any change to the buffer (a live prepend or a reseed) puts the ticker back
/// on the newest item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ticker {
    index: usize,
    revision: u64,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Advance by one, wrapping at `len`. An empty buffer pins the index to 0.
    pub fn advance(&mut self, len: usize) {
        self.index = if len == 0 { 0 } else { (self.index + 1) % len };
    }

    /// Record the buffer revision; returns true (and resets to the newest
    /// item) if it changed.
    pub fn observe(&mut self, revision: u64) -> bool {
        if revision == self.revision {
            return false;
        }
        self.revision = revision;
        self.index = 0;
        true
    }

    pub fn current<'a, T>(&self, buffer: &'a LiveBuffer<T>) -> Option<&'a T> {
        buffer.get(self.index).or_else(|| buffer.get(0))
    }
}

/// Background timer that advances a shared [`Ticker`] every interval. A buffer
/// change resets the index and restarts the interval. Dropping stops it.
pub struct TickerDriver {
    ticker: Arc<Mutex<Ticker>>,
    task: JoinHandle<()>,
}

impl TickerDriver {
    pub fn spawn<T: Send + 'static>(
        buffer: Arc<Mutex<LiveBuffer<T>>>,
        revisions: watch::Receiver<u64>,
        interval: Duration,
    ) -> Self {
        let ticker = Arc::new(Mutex::new(Ticker::new()));
        let task = tokio::spawn(run_ticker(
            Arc::clone(&ticker),
            buffer,
            revisions,
            interval,
        ));
        Self { ticker, task }
    }

    pub fn index(&self) -> usize {
        self.ticker.lock().index()
    }

    pub fn ticker(&self) -> Ticker {
        self.ticker.lock().clone()
    }
}

impl Drop for TickerDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_ticker<T>(
    ticker: Arc<Mutex<Ticker>>,
    buffer: Arc<Mutex<LiveBuffer<T>>>,
    mut revisions: watch::Receiver<u64>,
    interval: Duration,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let len = buffer.lock().len();
                ticker.lock().advance(len);
            }
            res = revisions.changed() => {
                if res.is_err() {
                    return;
                }
                let revision = *revisions.borrow_and_update();
                ticker.lock().observe(revision);
            }
        }
    }
}
