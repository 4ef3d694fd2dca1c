//! Request and Response Interceptors
//!
//! Interceptors run in registration order, each receiving the previous one's
//! output. Request interceptors see the request after authentication headers
//! have been attached; response interceptors see successful responses only.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::core::{HttpMethod, HttpResponse};
use crate::error::MinimaxResult;
use crate::types::{row_version_of, ROW_VERSION_FIELD};

/// Request as seen by interceptors, before serialization.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the API base URL.
    pub path: String,
    /// Fully resolved URL, including the query string.
    pub url: String,
    pub headers: HashMap<String, String>,
    /// JSON body.
    pub body: Option<Value>,
    /// Resource the request acts on, used for RowVersion injection.
    pub resource: Option<Value>,
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Transforms outgoing requests.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: ApiRequest) -> MinimaxResult<ApiRequest>;
}

/// Transforms successful responses.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync {
    async fn intercept(
        &self,
        response: HttpResponse,
        request: &ApiRequest,
    ) -> MinimaxResult<HttpResponse>;
}

/// Merge `resource.RowVersion` into `data` unless `data` already carries one.
///
/// Non-object `data` is returned unchanged.
pub fn add_row_version(resource: &Value, data: Value) -> Value {
    match data {
        Value::Object(mut map) => {
            if !has_row_version(&map) {
                if let Some(version) = resource.get(ROW_VERSION_FIELD).filter(|v| !v.is_null()) {
                    map.insert(ROW_VERSION_FIELD.to_string(), version.clone());
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn has_row_version(map: &Map<String, Value>) -> bool {
    map.get(ROW_VERSION_FIELD)
        .map(|v| !v.is_null())
        .unwrap_or(false)
}

/// Injects the resource's RowVersion into write requests that lack one.
#[derive(Debug, Default, Clone, Copy)]
pub struct RowVersionInterceptor;

#[async_trait]
impl RequestInterceptor for RowVersionInterceptor {
    async fn intercept(&self, mut request: ApiRequest) -> MinimaxResult<ApiRequest> {
        if !request.method.is_write() {
            return Ok(request);
        }

        if let Some(resource) = &request.resource {
            if let Some(body) = request.body.take() {
                let injected = add_row_version(resource, body);
                if row_version_of(&injected).is_some() {
                    debug!(path = %request.path, "RowVersion attached to request body");
                }
                request.body = Some(injected);
            }
        }

        Ok(request)
    }
}

/// Debug-level logging of outgoing requests and incoming responses.
///
/// Header values and bodies are never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingInterceptor;

#[async_trait]
impl RequestInterceptor for LoggingInterceptor {
    async fn intercept(&self, request: ApiRequest) -> MinimaxResult<ApiRequest> {
        debug!(
            method = %request.method,
            url = %request.url,
            has_body = request.body.is_some(),
            row_version = request.body.as_ref().and_then(row_version_of).is_some(),
            "Outgoing request"
        );
        Ok(request)
    }
}

#[async_trait]
impl ResponseInterceptor for LoggingInterceptor {
    async fn intercept(
        &self,
        response: HttpResponse,
        request: &ApiRequest,
    ) -> MinimaxResult<HttpResponse> {
        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            body_bytes = response.body.len(),
            "Response received"
        );
        Ok(response)
    }
}
