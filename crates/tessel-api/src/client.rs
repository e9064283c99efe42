// REST API HTTP client
//
// Wraps `reqwest::Client` with base-URL resolution, error-envelope
// decoding, and collection envelope unwrapping. The client knows nothing
// about entities or pagination keys; it executes one request at a time.

use reqwest::Method;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::envelope::{PageEnvelope, error_details};
use crate::error::Error;
use crate::transport::TransportConfig;

/// A single HTTP exchange to perform against the API.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw HTTP client for the console API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path against the base URL.
    ///
    /// Absolute URLs pass through untouched; relative paths are appended to
    /// the base path, so `https://host/api/v2` + `apps/1` gives
    /// `https://host/api/v2/apps/1`.
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// Send a request and decode the JSON body.
    ///
    /// Returns `None` for empty success bodies (e.g. `204 No Content`).
    pub async fn send(&self, request: ApiRequest) -> Result<Option<Value>, Error> {
        let url = self.url(&request.path)?;
        debug!(method = %request.method, %url, "sending API request");

        let mut builder = self.http.request(request.method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let timed_out = |e: reqwest::Error| {
            if e.is_timeout() {
                Error::Timeout {
                    url: url.to_string(),
                }
            } else {
                Error::Transport(e)
            }
        };
        let resp = builder.send().await.map_err(timed_out)?;
        let status = resp.status();
        let text = resp.text().await.map_err(timed_out)?;
        trace!(status = status.as_u16(), bytes = text.len(), "API response received");

        if !status.is_success() {
            let fallback = status.canonical_reason().unwrap_or("request failed");
            let (message, code) = error_details(&text, fallback);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
                code,
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: text,
            })
    }

    /// Send a request and decode the body as one collection page.
    pub async fn fetch_page(&self, request: ApiRequest) -> Result<PageEnvelope, Error> {
        match self.send(request).await? {
            Some(body) => PageEnvelope::from_value(body),
            None => Ok(PageEnvelope {
                total_results: Some(0),
                total_pages: Some(0),
                resources: Vec::new(),
            }),
        }
    }
}
