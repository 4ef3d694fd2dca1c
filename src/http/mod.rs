//! Request Pipeline
//!
//! Executes one logical API call: authentication and organization headers,
//! request interceptors, transport, response interceptors, error
//! classification and retry.

pub mod interceptors;
pub mod middleware;

pub use interceptors::{
    add_row_version, ApiRequest, LoggingInterceptor, RequestInterceptor, ResponseInterceptor,
    RowVersionInterceptor,
};
pub use middleware::{
    classify_default, ConcurrencyClassifier, ErrorMiddleware, ErrorMiddlewareChain, Next,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestFailure};
use crate::error::{MinimaxError, MinimaxResult};
use crate::resilience::{DefaultRetryPolicy, RetryPolicy};
use crate::session::SessionManager;
use crate::types::{MinimaxConfig, ORGANIZATION_HEADER};

/// Per-call options.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    /// Attach a bearer token and the organization header (default: true).
    pub authenticate: bool,
    /// Organization override for this call.
    pub organization_id: Option<String>,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Extra headers for this call.
    pub headers: Vec<(String, String)>,
    /// Resource the call acts on, for RowVersion injection.
    pub resource: Option<Value>,
    /// Timeout override for this call.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            authenticate: true,
            organization_id: None,
            query: Vec::new(),
            headers: Vec::new(),
            resource: None,
            timeout: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send without a bearer token or organization header.
    pub fn unauthenticated(mut self) -> Self {
        self.authenticate = false;
        self
    }

    pub fn organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn resource(mut self, resource: Value) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Authenticated HTTP client for the Minimax API.
pub struct HttpClient {
    config: MinimaxConfig,
    transport: Arc<dyn HttpTransport>,
    session: Arc<SessionManager>,
    request_interceptors: RwLock<Vec<Arc<dyn RequestInterceptor>>>,
    response_interceptors: RwLock<Vec<Arc<dyn ResponseInterceptor>>>,
    middleware: RwLock<ErrorMiddlewareChain>,
    retry_policy: RwLock<Arc<dyn RetryPolicy>>,
}

impl HttpClient {
    /// Pipeline with the RowVersion interceptor, the concurrency classifier and
    /// the configured retry policy installed.
    pub fn new(
        config: MinimaxConfig,
        transport: Arc<dyn HttpTransport>,
        session: Arc<SessionManager>,
    ) -> Self {
        let retry_policy: Arc<dyn RetryPolicy> =
            Arc::new(DefaultRetryPolicy::new(config.retry.clone()));

        Self {
            config,
            transport,
            session,
            request_interceptors: RwLock::new(vec![Arc::new(RowVersionInterceptor)]),
            response_interceptors: RwLock::new(Vec::new()),
            middleware: RwLock::new(ErrorMiddlewareChain::new()),
            retry_policy: RwLock::new(retry_policy),
        }
    }

    pub fn config(&self) -> &MinimaxConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn add_request_interceptor(&self, interceptor: Arc<dyn RequestInterceptor>) {
        write(&self.request_interceptors).push(interceptor);
    }

    pub fn add_response_interceptor(&self, interceptor: Arc<dyn ResponseInterceptor>) {
        write(&self.response_interceptors).push(interceptor);
    }

    pub fn clear_request_interceptors(&self) {
        write(&self.request_interceptors).clear();
    }

    pub fn clear_response_interceptors(&self) {
        write(&self.response_interceptors).clear();
    }

    /// Append an error classifier after those already registered.
    pub fn add_error_middleware(&self, middleware: Arc<dyn ErrorMiddleware>) {
        write(&self.middleware).push(middleware);
    }

    /// Edit the error classifier chain in place.
    pub fn with_error_middleware<R>(&self, f: impl FnOnce(&mut ErrorMiddlewareChain) -> R) -> R {
        f(&mut write(&self.middleware))
    }

    pub fn set_retry_policy(&self, policy: Arc<dyn RetryPolicy>) {
        *write(&self.retry_policy) = policy;
    }

    /// Organization for a call: the per-call override, else the session selection.
    pub fn resolve_organization(&self, options: &RequestOptions) -> Option<String> {
        options
            .organization_id
            .clone()
            .or_else(|| self.session.get_organization_id())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> MinimaxResult<T> {
        self.request(HttpMethod::Get, path, None, options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> MinimaxResult<T> {
        let body = to_json(body)?;
        self.request(HttpMethod::Post, path, Some(body), options).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> MinimaxResult<T> {
        let body = to_json(body)?;
        self.request(HttpMethod::Put, path, Some(body), options).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> MinimaxResult<T> {
        let body = to_json(body)?;
        self.request(HttpMethod::Patch, path, Some(body), options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> MinimaxResult<T> {
        self.request(HttpMethod::Delete, path, None, options).await
    }

    /// PUT `patch` carrying the RowVersion last read on `resource`.
    ///
    /// A RowVersion already present in `patch` wins.
    pub async fn update_with_concurrency<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        resource: &Value,
        patch: &B,
        options: RequestOptions,
    ) -> MinimaxResult<T> {
        let body = add_row_version(resource, to_json(patch)?);
        let options = options.resource(resource.clone());
        self.request(HttpMethod::Put, path, Some(body), options).await
    }

    /// Execute a request and deserialize the response body.
    ///
    /// An empty body deserializes as JSON `null`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> MinimaxResult<T> {
        let response = self.request_raw(method, path, body, options).await?;
        parse_body(&response)
    }

    /// Execute a request with retry and return the successful raw response.
    pub async fn request_raw(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> MinimaxResult<HttpResponse> {
        let middleware = read(&self.middleware).clone();
        let retry_policy = read(&self.retry_policy).clone();
        let mut attempt: u32 = 0;

        loop {
            debug!(method = %method, path, attempt, "Dispatching request");

            let failure = match self.attempt(method, path, body.clone(), &options).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            let error = middleware.classify(failure);

            if !retry_policy.should_retry(&error, attempt) {
                warn!(
                    method = %method,
                    path,
                    attempt,
                    code = error.kind().code(),
                    status = ?error.status_code(),
                    "Request failed"
                );
                return Err(error);
            }

            let delay = retry_policy.retry_delay(attempt, &error);
            warn!(
                method = %method,
                path,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                code = error.kind().code(),
                "Retrying request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> Result<HttpResponse, RequestFailure> {
        let mut request = self.build_request(method, path, body, options)?;

        if options.authenticate {
            let token = self.session.get_auth_token().await?;
            request
                .headers
                .insert("Authorization".to_string(), token.authorization_header());

            if let Some(organization_id) = self.resolve_organization(options) {
                request
                    .headers
                    .insert(ORGANIZATION_HEADER.to_string(), organization_id);
            }
        }

        let request_interceptors = read(&self.request_interceptors).clone();
        for interceptor in &request_interceptors {
            request = interceptor.intercept(request).await?;
        }

        let http_request = to_http_request(&request)?;
        let response = self.transport.send(http_request).await?;

        if !response.is_success() {
            return Err(RequestFailure::Response(response));
        }

        let response_interceptors = read(&self.response_interceptors).clone();
        let mut response = response;
        for interceptor in &response_interceptors {
            response = interceptor.intercept(response, &request).await?;
        }

        Ok(response)
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> MinimaxResult<ApiRequest> {
        let mut url = self.config.endpoint_url(path);
        if !options.query.is_empty() {
            let query = serde_urlencoded::to_string(&options.query).map_err(|e| {
                MinimaxError::api("failed to encode query string").with_source(e)
            })?;
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&query);
        }

        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        if body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        for (name, value) in self.config.headers.iter().chain(options.headers.iter()) {
            headers.insert(name.clone(), value.clone());
        }

        Ok(ApiRequest {
            method,
            path: path.to_string(),
            url,
            headers,
            body,
            resource: options.resource.clone(),
            timeout: Some(options.timeout.unwrap_or(self.config.timeout)),
        })
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> MinimaxResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| MinimaxError::api("failed to serialize request body").with_source(e))
}

fn to_http_request(request: &ApiRequest) -> MinimaxResult<HttpRequest> {
    let body = request
        .body
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| MinimaxError::api("failed to serialize request body").with_source(e))?;

    Ok(HttpRequest {
        method: request.method,
        url: request.url.clone(),
        headers: request.headers.clone(),
        body,
        timeout: request.timeout,
    })
}

fn parse_body<T: DeserializeOwned>(response: &HttpResponse) -> MinimaxResult<T> {
    let parsed = if response.body.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(&response.body)
    };

    parsed.map_err(|e| {
        MinimaxError::api(format!("failed to parse response body: {}", e))
            .with_status(response.status)
            .with_source(e)
    })
}
