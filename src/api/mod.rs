//! Backend access for the intel API.
//!
//! All REST calls and the live event stream go through the [`Backend`] trait so
//! the cache, live feeds and pages can run against the reqwest client in
//! production and a scripted fake in tests.

pub mod endpoints;
pub mod http;
#[cfg(test)]
pub mod test_utils;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;

use crate::error::ClientError;

/// Raw chunks of a server-sent event stream.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, ClientError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query-string parameters. Ordered so that two requests built from the same
/// filters produce equal cache keys regardless of insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    /// Adds the parameter only when a value is present.
    pub fn with_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    /// Adds a filter value unless it is empty or the "all" choice.
    pub fn with_filter(self, key: &str, value: &str) -> Self {
        if value.is_empty() || value == "all" {
            self
        } else {
            self.with(key, value)
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Transport seam between the client core and the intel API.
///
/// Session credentials are the backend's concern; callers never attach tokens.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Perform a JSON request. Non-success statuses map through
    /// [`ClientError::from_status`].
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &QueryParams,
        body: Option<&Value>,
    ) -> Result<Value, ClientError>;

    /// Open a server-sent event stream.
    async fn open_stream(&self, path: &str) -> Result<ByteStream, ClientError>;

    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, ClientError> {
        self.request(Method::Get, path, params, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::Post, path, &QueryParams::new(), Some(body))
            .await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        self.request(Method::Put, path, &QueryParams::new(), Some(body))
            .await
    }

    async fn delete(&self, path: &str) -> Result<Value, ClientError> {
        self.request(Method::Delete, path, &QueryParams::new(), None)
            .await
    }
}

/// Decode a JSON payload into a typed record.
pub fn decode<T: serde::de::DeserializeOwned>(value: &Value) -> Result<T, ClientError> {
    T::deserialize(value).map_err(ClientError::from)
}

/// Pull the `{"error": "..."}` message out of a failed response body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_skip_all_filter() {
        let params = QueryParams::new()
            .with_filter("entity_type", "all")
            .with_filter("threat_level", "critical")
            .with_filter("search", "")
            .with_opt("entity_id", Some(4))
            .with_opt::<i64>("page", None);
        assert_eq!(params.get("threat_level"), Some("critical"));
        assert_eq!(params.get("entity_id"), Some("4"));
        assert_eq!(params.get("entity_type"), None);
        assert_eq!(params.iter().count(), 2);
    }

    #[test]
    fn test_params_order_independent() {
        let a = QueryParams::new().with("a", 1).with("b", 2);
        let b = QueryParams::new().with("b", 2).with("a", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error": "Generation already in progress"}"#),
            "Generation already in progress"
        );
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
    }
}
