//! Write calls followed by invalidation of the reads they affect.
//!
//! Nothing is applied to cached lists locally; views show the server's state
//! once the invalidated keys are refetched.

use std::time::Duration;

use serde_json::Value;

use super::{QueryCache, QueryKey};
use crate::api::{Method, QueryParams};
use crate::error::ClientError;

#[derive(Debug, Clone)]
enum Target {
    Scope(&'static str),
    Key(QueryKey),
}

#[derive(Debug, Clone)]
pub struct Mutation {
    method: Method,
    path: String,
    body: Option<Value>,
    targets: Vec<Target>,
    delayed: Option<(Duration, Vec<&'static str>)>,
}

impl Mutation {
    fn new(method: Method, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            targets: Vec::new(),
            delayed: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path, Some(body))
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path, Some(body))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path, None)
    }

    pub fn invalidates(mut self, scope: &'static str) -> Self {
        self.targets.push(Target::Scope(scope));
        self
    }

    pub fn invalidates_key(mut self, key: QueryKey) -> Self {
        self.targets.push(Target::Key(key));
        self
    }

    /// Invalidate `scope` again after `delay`, for work the server finishes
    /// asynchronously after acknowledging the write.
    pub fn invalidates_after(mut self, delay: Duration, scope: &'static str) -> Self {
        match &mut self.delayed {
            Some((_, scopes)) => scopes.push(scope),
            None => self.delayed = Some((delay, vec![scope])),
        }
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Perform the write. Invalidation happens only on success.
    pub async fn run(self, cache: &QueryCache) -> Result<Value, ClientError> {
        let result = cache
            .backend()
            .request(self.method, &self.path, &QueryParams::new(), self.body.as_ref())
            .await;

        let value = match result {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Mutation: {} {} failed: {}", self.method, self.path, e);
                return Err(e);
            }
        };

        for target in &self.targets {
            match target {
                Target::Scope(scope) => cache.invalidate(scope),
                Target::Key(key) => cache.invalidate_key(key),
            }
        }

        if let Some((delay, scopes)) = self.delayed {
            let cache = cache.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                for scope in scopes {
                    cache.invalidate(scope);
                }
            });
        }

        Ok(value)
    }
}
