//! HTTP Transport
//!
//! Transport interface and implementations for API and token requests.
//! A transport never classifies failures; it reports either a response of any
//! status or one of the [`TransportError`] variants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::error::{MinimaxError, MinimaxResult};

/// Default maximum accepted response body size (10MB).
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// HTTP request definition.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Request timeout.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// HTTP method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry a resource body.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP response definition.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Status text.
    pub status_text: String,
    /// Response headers (lower-cased names).
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// `Retry-After` in seconds. Accepts delta-seconds or an HTTP-date.
    pub fn retry_after(&self) -> Option<u64> {
        self.retry_after_at(Utc::now())
    }

    /// `Retry-After` relative to `now`. A date in the past yields zero.
    pub fn retry_after_at(&self, now: DateTime<Utc>) -> Option<u64> {
        let value = self.header("retry-after")?.trim();
        if let Ok(seconds) = value.parse::<u64>() {
            return Some(seconds);
        }

        let at = DateTime::parse_from_rfc2822(value).ok()?;
        let seconds = at.with_timezone(&Utc).signed_duration_since(now).num_seconds();
        Some(u64::try_from(seconds).unwrap_or(0))
    }
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Failure reported by a transport when no usable response was produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The request was sent (or attempted) but nothing came back.
    #[error("no response received: {message}")]
    NoResponse { message: String, timed_out: bool },
    /// The request could not be built or the response could not be accepted.
    #[error("{message}")]
    Other { message: String },
}

/// Raw request failure as seen by the error middleware chain.
#[derive(Debug, Clone)]
pub enum RequestFailure {
    /// A non-success response was received.
    Response(HttpResponse),
    /// No response was received.
    NoResponse { message: String, timed_out: bool },
    /// Failure unrelated to the remote side.
    Other { message: String },
    /// Already classified upstream (token acquisition, response interceptors).
    Typed(MinimaxError),
}

impl From<TransportError> for RequestFailure {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::NoResponse { message, timed_out } => {
                Self::NoResponse { message, timed_out }
            }
            TransportError::Other { message } => Self::Other { message },
        }
    }
}

impl From<MinimaxError> for RequestFailure {
    fn from(error: MinimaxError) -> Self {
        Self::Typed(error)
    }
}

/// HTTP transport interface (for dependency injection).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default reqwest-based HTTP transport.
pub struct ReqwestHttpTransport {
    client: reqwest::Client,
    default_timeout: Duration,
    max_response_size: usize,
}

impl ReqwestHttpTransport {
    /// Create transport with the given default timeout.
    pub fn new(timeout: Duration) -> MinimaxResult<Self> {
        Self::with_options(timeout, DEFAULT_MAX_RESPONSE_SIZE)
    }

    /// Create transport with custom options.
    pub fn with_options(timeout: Duration, max_response_size: usize) -> MinimaxResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                MinimaxError::configuration("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            client,
            default_timeout: timeout,
            max_response_size,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::NoResponse {
            message: format!("request timed out after {}ms", timeout.as_millis()),
            timed_out: true,
        }
    } else if error.is_builder() {
        TransportError::Other {
            message: error.to_string(),
        }
    } else {
        TransportError::NoResponse {
            message: error.to_string(),
            timed_out: false,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let timeout = request.timeout.unwrap_or(self.default_timeout);

        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
            HttpMethod::Patch => self.client.patch(&request.url),
            HttpMethod::Delete => self.client.delete(&request.url),
        };

        for (key, value) in &request.headers {
            req_builder = req_builder.header(key, value);
        }

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        req_builder = req_builder.timeout(timeout);

        let response = req_builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }

        if let Some(len) = response.content_length() {
            if len as usize > self.max_response_size {
                return Err(TransportError::Other {
                    message: format!("response too large: {} bytes", len),
                });
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        if body.len() > self.max_response_size {
            return Err(TransportError::Other {
                message: format!("response too large: {} bytes", body.len()),
            });
        }

        Ok(HttpResponse {
            status,
            status_text,
            headers,
            body,
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock HTTP transport for testing.
///
/// Queued outcomes are returned in the order they were queued.
#[derive(Default)]
pub struct MockHttpTransport {
    outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    request_history: Mutex<Vec<(Instant, HttpRequest)>>,
    default_response: Mutex<Option<HttpResponse>>,
    delay: Mutex<Option<Duration>>,
}

impl MockHttpTransport {
    /// Create new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: HttpResponse) -> &Self {
        lock(&self.outcomes).push_back(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn queue_json_response<T: serde::Serialize>(&self, status: u16, body: &T) -> &Self {
        let body = serde_json::to_string(body).unwrap_or_default();
        let response = HttpResponse {
            status,
            status_text: if status < 400 { "OK" } else { "Error" }.to_string(),
            headers: [("content-type".to_string(), "application/json".to_string())]
                .into_iter()
                .collect(),
            body,
        };
        self.queue_response(response)
    }

    /// Queue a transport failure.
    pub fn queue_error(&self, error: TransportError) -> &Self {
        lock(&self.outcomes).push_back(Err(error));
        self
    }

    /// Set default response when queue is empty.
    pub fn set_default_response(&self, response: HttpResponse) -> &Self {
        *lock(&self.default_response) = Some(response);
        self
    }

    /// Delay every response by `delay`.
    pub fn set_delay(&self, delay: Duration) -> &Self {
        *lock(&self.delay) = Some(delay);
        self
    }

    /// Get request history.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.request_history)
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Instants at which each request was received.
    pub fn request_instants(&self) -> Vec<Instant> {
        lock(&self.request_history).iter().map(|(at, _)| *at).collect()
    }

    /// Get last request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.request_history).last().map(|(_, r)| r.clone())
    }

    pub fn request_count(&self) -> usize {
        lock(&self.request_history).len()
    }

    /// Clear request history.
    pub fn clear_history(&self) {
        lock(&self.request_history).clear();
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        lock(&self.request_history).push((Instant::now(), request));

        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = lock(&self.outcomes).pop_front();
        match outcome {
            Some(outcome) => outcome,
            None => lock(&self.default_response)
                .clone()
                .ok_or_else(|| TransportError::NoResponse {
                    message: "No mock response available".to_string(),
                    timed_out: false,
                }),
        }
    }
}
