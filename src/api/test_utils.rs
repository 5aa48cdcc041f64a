//! Scripted in-memory backend for unit tests.
//!
//! Routes are written as `"METHOD /path"`. A scripted sequence is consumed one
//! response per call and its last response repeats. Unscripted routes answer
//! `NotFound`.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{Backend, ByteStream, Method, QueryParams};
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct Call {
    pub route: String,
    pub params: QueryParams,
    pub body: Option<Value>,
}

type Chunk = Result<Vec<u8>, ClientError>;

#[derive(Default)]
pub struct FakeBackend {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, ClientError>>>>,
    calls: Mutex<Vec<Call>>,
    streams: Mutex<HashMap<String, VecDeque<mpsc::UnboundedReceiver<Chunk>>>>,
    latency: Duration,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn respond(&self, route: &str, value: Value) {
        self.respond_seq(route, vec![value]);
    }

    pub fn respond_seq(&self, route: &str, values: Vec<Value>) {
        self.responses
            .lock()
            .insert(route.to_string(), values.into_iter().map(Ok).collect());
    }

    pub fn fail(&self, route: &str, error: ClientError) {
        self.responses
            .lock()
            .insert(route.to_string(), VecDeque::from([Err(error)]));
    }

    pub fn calls(&self, route: &str) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.route == route)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, route: &str) -> usize {
        self.calls(route).len()
    }

    pub fn last_body(&self, route: &str) -> Option<Value> {
        self.calls(route).into_iter().last().and_then(|c| c.body)
    }

    /// Queue an event stream for the next `open_stream(path)`.
    pub fn push_stream(&self, path: &str) -> StreamHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(rx);
        StreamHandle { tx }
    }

    fn next_response(&self, route: &str) -> Result<Value, ClientError> {
        let mut responses = self.responses.lock();
        match responses.get_mut(route) {
            Some(seq) if seq.len() > 1 => seq
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::NotFound(route.to_string()))),
            Some(seq) => seq
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ClientError::NotFound(route.to_string()))),
            None => Err(ClientError::NotFound(route.to_string())),
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &QueryParams,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let route = format!("{} {}", method, path);
        self.calls.lock().push(Call {
            route: route.clone(),
            params: params.clone(),
            body: body.cloned(),
        });
        let response = self.next_response(&route);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        response
    }

    async fn open_stream(&self, path: &str) -> Result<ByteStream, ClientError> {
        self.calls.lock().push(Call {
            route: format!("STREAM {}", path),
            params: QueryParams::new(),
            body: None,
        });
        let rx = self
            .streams
            .lock()
            .get_mut(path)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| ClientError::Stream(format!("no stream scripted for {}", path)))?;

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });
        Ok(stream.boxed())
    }
}

/// Server side of a scripted event stream. Dropping it ends the stream.
pub struct StreamHandle {
    tx: mpsc::UnboundedSender<Chunk>,
}

impl StreamHandle {
    pub fn send_raw(&self, text: &str) {
        let _ = self.tx.send(Ok(text.as_bytes().to_vec()));
    }

    pub fn send_data(&self, value: &Value) {
        self.send_raw(&format!("data: {}\n\n", value));
    }

    pub fn send_error(&self, message: &str) {
        let _ = self.tx.send(Err(ClientError::Stream(message.to_string())));
    }
}
