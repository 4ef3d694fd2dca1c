//! Minimax Error Types
//!
//! Flat error taxonomy shared by every layer of the client. Raw transport
//! failures are classified exactly once (see [`crate::http::middleware`]);
//! everything above that boundary only sees [`MinimaxError`].

use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;

/// Result type for Minimax operations.
pub type MinimaxResult<T> = Result<T, MinimaxError>;

/// Error kind with kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Credentials rejected, or the session has no usable token.
    Authentication,
    /// Request rejected with a field-level validation payload.
    Validation {
        /// Raw validation payload as returned by the API.
        errors: Option<serde_json::Value>,
    },
    /// Resource does not exist.
    NotFound,
    /// Optimistic concurrency conflict.
    Concurrency {
        /// RowVersion currently persisted on the server, when it could be extracted.
        current_row_version: Option<String>,
    },
    /// Too many requests.
    RateLimit {
        /// Seconds to wait before retrying, from `Retry-After`.
        retry_after: Option<u64>,
    },
    /// Server-side failure (5xx).
    Server,
    /// No response received.
    Network {
        /// Whether the request hit its timeout.
        timed_out: bool,
    },
    /// Invalid client configuration.
    Configuration,
    /// Token store failure.
    Storage,
    /// Anything not covered by a more specific kind.
    Api,
}

impl ErrorKind {
    /// Stable code for programmatic handling and telemetry.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication => "authentication_error",
            Self::Validation { .. } => "validation_error",
            Self::NotFound => "not_found_error",
            Self::Concurrency { .. } => "concurrency_error",
            Self::RateLimit { .. } => "rate_limit_error",
            Self::Server => "server_error",
            Self::Network { .. } => "network_error",
            Self::Configuration => "configuration_error",
            Self::Storage => "storage_error",
            Self::Api => "api_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Typed Minimax error.
///
/// Immutable once built; context is added by wrapping, which keeps the
/// original reachable through [`std::error::Error::source`].
#[derive(Error, Debug, Clone)]
#[error("[{kind}] {message}")]
pub struct MinimaxError {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl MinimaxError {
    /// Creates a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn validation(message: impl Into<String>, errors: Option<serde_json::Value>) -> Self {
        Self::new(ErrorKind::Validation { errors }, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn concurrency(message: impl Into<String>, current_row_version: Option<String>) -> Self {
        Self::new(ErrorKind::Concurrency { current_row_version }, message)
    }

    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::new(ErrorKind::RateLimit { retry_after }, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network { timed_out: false }, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network { timed_out: true }, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Api, message)
    }

    /// Sets the HTTP status code.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Sets the underlying cause.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Wraps this error with additional context, keeping the kind, the status
    /// code and the original error as the cause.
    pub fn context(self, message: impl Into<String>) -> Self {
        let message = format!("{}: {}", message.into(), self.message);
        Self {
            kind: self.kind.clone(),
            message,
            status_code: self.status_code,
            source: Some(Arc::new(self)),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Returns the wrapped Minimax error, if the cause is one.
    pub fn inner(&self) -> Option<&MinimaxError> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<MinimaxError>())
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication)
    }

    pub fn is_network(&self) -> bool {
        matches!(self.kind, ErrorKind::Network { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound)
    }

    pub fn is_concurrency(&self) -> bool {
        matches!(self.kind, ErrorKind::Concurrency { .. })
    }

    /// RowVersion carried by a concurrency error.
    pub fn current_row_version(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Concurrency {
                current_row_version,
            } => current_row_version.as_deref(),
            _ => None,
        }
    }

    /// Validation payload carried by a validation error.
    pub fn validation_errors(&self) -> Option<&serde_json::Value> {
        match &self.kind {
            ErrorKind::Validation { errors } => errors.as_ref(),
            _ => None,
        }
    }

    /// Get retry-after duration if applicable.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ErrorKind::RateLimit {
                retry_after: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Check if error is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Network { .. } | ErrorKind::RateLimit { .. } | ErrorKind::Server
        )
    }

    /// Builds a typed error from a non-success API response.
    pub fn from_response(status: u16, retry_after: Option<u64>, body: &str) -> Self {
        let parsed = parse_error_response(body);
        let message = response_message(status, body);
        let lowered = message.to_lowercase();

        let error = match status {
            401 => Self::authentication(message),
            404 => Self::not_found(message),
            409 => {
                let current = extract_row_version(&message);
                Self::concurrency(message, current)
            }
            429 => Self::rate_limit(message, retry_after),
            s if s >= 500 => Self::server(message),
            _ if lowered.contains("not found") => Self::not_found(message),
            400 | 422 => {
                let errors = parsed.and_then(|p| p.errors);
                Self::validation(message, errors)
            }
            _ => Self::api(message),
        };

        error.with_status(status)
    }
}

/// Error body returned by the API and the auth endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, alias = "Message")]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(
        default,
        alias = "Errors",
        alias = "ValidationErrors",
        alias = "ModelState"
    )]
    pub errors: Option<serde_json::Value>,
}

impl ApiErrorBody {
    fn best_message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
            .filter(|m| !m.trim().is_empty())
    }

    /// Message in the `error: error_description` shape used by the auth endpoint.
    pub fn oauth_message(&self) -> Option<String> {
        match (&self.error, &self.error_description) {
            (Some(error), Some(description)) => Some(format!("{}: {}", error, description)),
            (Some(error), None) => Some(error.clone()),
            (None, Some(description)) => Some(description.clone()),
            (None, None) => self.message.clone(),
        }
    }
}

/// Parse error response from HTTP body.
pub fn parse_error_response(body: &str) -> Option<ApiErrorBody> {
    serde_json::from_str(body).ok()
}

/// Human-readable message for an error response.
pub fn response_message(status: u16, body: &str) -> String {
    parse_error_response(body)
        .as_ref()
        .and_then(ApiErrorBody::best_message)
        .unwrap_or_else(|| fallback_message(status, body))
}

fn fallback_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status)
    } else {
        let snippet: String = trimmed.chars().take(200).collect();
        format!("HTTP {}: {}", status, snippet)
    }
}

fn row_version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)row\s*version\s*(?::|=|\bis\b)\s*['"]?([A-Za-z0-9+/=_\-]+)"#)
            .unwrap_or_else(|e| panic!("invalid RowVersion pattern: {}", e))
    })
}

/// Best-effort extraction of the server's current RowVersion from free text.
pub fn extract_row_version(message: &str) -> Option<String> {
    row_version_pattern()
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether free text describes a concurrency conflict.
pub fn mentions_concurrency(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("concurrency") || lowered.contains("rowversion")
}
