//! Token Types
//!
//! Bearer token, token endpoint response and login credentials.

use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Default validity buffer applied before the real expiry instant.
pub const DEFAULT_TOKEN_BUFFER_MS: i64 = 60_000;

/// Default OAuth2 scope requested by the password grant.
pub const DEFAULT_SCOPE: &str = "minimax.rs";

/// Token response from the auth endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Bearer token as persisted by a token store.
///
/// The absolute expiry instant is `obtained_at + expires_in * 1000`
/// (milliseconds since the Unix epoch). A token missing either field is never
/// considered valid.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the token was issued, in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obtained_at: Option<i64>,
}

impl Token {
    /// Stamps a token endpoint response with the time it was obtained.
    pub fn from_response(response: TokenResponse, obtained_at_ms: i64) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
            obtained_at: Some(obtained_at_ms),
        }
    }

    /// Absolute expiry in milliseconds since the Unix epoch.
    pub fn expires_at_ms(&self) -> Option<i64> {
        let obtained_at = self.obtained_at?;
        let expires_in = i64::try_from(self.expires_in?).ok()?;
        obtained_at.checked_add(expires_in.checked_mul(1000)?)
    }

    /// Absolute expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at_ms()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// Whether the token is usable at `now_ms` given a safety buffer.
    ///
    /// Exactly at `expiry - buffer` the token is already invalid.
    pub fn is_valid_at(&self, now_ms: i64, buffer_ms: i64) -> bool {
        match self.expires_at_ms() {
            Some(expires_at) => now_ms < expires_at.saturating_sub(buffer_ms),
            None => false,
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .map(|t| !t.is_empty())
            .unwrap_or(false)
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// User credentials for the password grant. Never persisted.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub scope: String,
}

impl Credentials {
    /// Create credentials with the default scope.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Set the requested scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub(crate) fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}
