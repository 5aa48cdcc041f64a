//! reqwest transport for the intel API.
//!
//! The cookie store keeps the session cookie set by the login endpoints, so
//! every later request is authenticated without manual token handling.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use url::Url;

use super::{error_message, Backend, ByteStream, Method, QueryParams};
use crate::error::ClientError;

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str, params: &QueryParams) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ClientError::Config(format!("invalid path '{}': {}", path, e)))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: &QueryParams,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let url = self.url(path, params)?;
        let mut req = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            log::debug!("HttpBackend: {} {} -> {}", method, path, status);
            return Err(ClientError::from_status(status.as_u16(), error_message(&text)));
        }

        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn open_stream(&self, path: &str) -> Result<ByteStream, ClientError> {
        let url = self.url(path, &QueryParams::new())?;
        let resp = self
            .client
            .get(url)
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), error_message(&text)));
        }

        let stream = resp
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ClientError::Stream(e.to_string()))
            })
            .boxed();
        Ok(stream)
    }
}
