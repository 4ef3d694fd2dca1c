//! Configuration Types
//!
//! Client configuration consumed by the session and request pipeline.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

use crate::builders::MinimaxConfigBuilder;
use crate::error::MinimaxResult;
use crate::resilience::RetryConfig;
use crate::token::{RefreshConfig, TokenStoreConfig};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://moj.minimax.rs/RS/API/";

/// Default token endpoint.
pub const DEFAULT_AUTH_URL: &str = "https://moj.minimax.rs/RS/aut/oauth20/token";

/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Header carrying the selected organization on API calls.
pub const ORGANIZATION_HEADER: &str = "X-Organization-Id";

/// Client identity sent on every token request.
#[derive(Clone)]
pub struct ClientIdentity {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ClientIdentity {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
        }
    }

    pub(crate) fn expose_secret(&self) -> &str {
        self.client_secret.expose_secret()
    }
}

impl std::fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Minimax client configuration.
#[derive(Clone, Debug)]
pub struct MinimaxConfig {
    /// OAuth2 client identity.
    pub identity: ClientIdentity,
    /// API base URL (always ends with `/`).
    pub base_url: Url,
    /// Token endpoint.
    pub auth_url: Url,
    /// Organization used when none has been selected on the session.
    pub default_org_id: Option<String>,
    /// Per-request transport timeout.
    pub timeout: Duration,
    /// Extra headers sent with every API request.
    pub headers: Vec<(String, String)>,
    /// Token persistence.
    pub token_store: TokenStoreConfig,
    /// Request retry tuning.
    pub retry: RetryConfig,
    /// Token refresh tuning.
    pub refresh: RefreshConfig,
}

impl MinimaxConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> MinimaxConfigBuilder {
        MinimaxConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MINIMAX_CLIENT_ID` (required)
    /// - `MINIMAX_CLIENT_SECRET` (required)
    /// - `MINIMAX_BASE_URL`, `MINIMAX_AUTH_URL` (optional)
    /// - `MINIMAX_ORG_ID` (optional): default organization
    /// - `MINIMAX_TIMEOUT_MS` (optional): request timeout in milliseconds
    /// - `MINIMAX_TOKEN_STORE` (optional): `memory`, `file` or `env`
    /// - `MINIMAX_TOKEN_FILE` (optional): token file path for the file store
    /// - `MINIMAX_TOKEN_ENV_VAR` (optional): variable name for the env store
    pub fn from_env() -> MinimaxResult<Self> {
        MinimaxConfigBuilder::new().from_env()?.build()
    }

    /// Resolves an API path against the base URL.
    pub fn endpoint_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}
