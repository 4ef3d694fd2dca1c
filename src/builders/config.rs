//! Configuration Builder
//!
//! Fluent builder for the Minimax client configuration.

use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{MinimaxError, MinimaxResult};
use crate::resilience::RetryConfig;
use crate::token::{RefreshConfig, TokenStoreConfig, DEFAULT_TOKEN_ENV_VAR};
use crate::types::{
    ClientIdentity, MinimaxConfig, DEFAULT_AUTH_URL, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS,
};

/// Minimax configuration builder.
#[derive(Default)]
pub struct MinimaxConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    base_url: Option<String>,
    auth_url: Option<String>,
    default_org_id: Option<String>,
    timeout: Option<Duration>,
    headers: Vec<(String, String)>,
    token_store: TokenStoreConfig,
    retry: RetryConfig,
    refresh: RefreshConfig,
}

impl MinimaxConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(SecretString::new(client_secret.into()));
        self
    }

    /// Set API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set token endpoint.
    pub fn auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = Some(auth_url.into());
        self
    }

    /// Set the organization selected at login when none is selected yet.
    pub fn default_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.default_org_id = Some(org_id.into());
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header sent with every API request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn token_store(mut self, token_store: TokenStoreConfig) -> Self {
        self.token_store = token_store;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn refresh(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = refresh;
        self
    }

    /// Apply `MINIMAX_*` environment variables on top of the current values.
    pub fn from_env(self) -> MinimaxResult<Self> {
        self.from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(mut self, lookup: F) -> MinimaxResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(client_id) = var("MINIMAX_CLIENT_ID") {
            self = self.client_id(client_id);
        }
        if let Some(client_secret) = var("MINIMAX_CLIENT_SECRET") {
            self = self.client_secret(client_secret);
        }
        if let Some(base_url) = var("MINIMAX_BASE_URL") {
            self = self.base_url(base_url);
        }
        if let Some(auth_url) = var("MINIMAX_AUTH_URL") {
            self = self.auth_url(auth_url);
        }
        if let Some(org_id) = var("MINIMAX_ORG_ID") {
            self = self.default_org_id(org_id);
        }
        if let Some(timeout) = var("MINIMAX_TIMEOUT_MS") {
            let millis = timeout.trim().parse::<u64>().map_err(|_| {
                MinimaxError::configuration(format!("invalid MINIMAX_TIMEOUT_MS: {}", timeout))
            })?;
            self = self.timeout(Duration::from_millis(millis));
        }

        if let Some(store) = var("MINIMAX_TOKEN_STORE") {
            self.token_store = match store.trim().to_lowercase().as_str() {
                "memory" => TokenStoreConfig::Memory,
                "file" => {
                    let path = var("MINIMAX_TOKEN_FILE").ok_or_else(|| {
                        MinimaxError::configuration(
                            "MINIMAX_TOKEN_FILE is required when MINIMAX_TOKEN_STORE=file",
                        )
                    })?;
                    TokenStoreConfig::File {
                        path: PathBuf::from(path),
                        create_dir: true,
                    }
                }
                "env" => TokenStoreConfig::Env {
                    var: var("MINIMAX_TOKEN_ENV_VAR")
                        .unwrap_or_else(|| DEFAULT_TOKEN_ENV_VAR.to_string()),
                },
                other => {
                    return Err(MinimaxError::configuration(format!(
                        "unknown MINIMAX_TOKEN_STORE: {}",
                        other
                    )))
                }
            };
        }

        Ok(self)
    }

    /// Build the configuration.
    pub fn build(self) -> MinimaxResult<MinimaxConfig> {
        let client_id = self
            .client_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| MinimaxError::configuration("client_id is required"))?;

        let client_secret = self
            .client_secret
            .filter(|secret| !secret.expose_secret().trim().is_empty())
            .ok_or_else(|| MinimaxError::configuration("client_secret is required"))?;

        let base_url = parse_url(
            "base_url",
            &with_trailing_slash(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)),
        )?;
        let auth_url = parse_url("auth_url", self.auth_url.as_deref().unwrap_or(DEFAULT_AUTH_URL))?;

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_millis(DEFAULT_TIMEOUT_MS));
        if timeout.is_zero() {
            return Err(MinimaxError::configuration("timeout must be greater than zero"));
        }

        if self.retry.multiplier < 1.0 || !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(MinimaxError::configuration(
                "retry multiplier must be >= 1 and jitter within 0..=1",
            ));
        }

        Ok(MinimaxConfig {
            identity: ClientIdentity {
                client_id,
                client_secret,
            },
            base_url,
            auth_url,
            default_org_id: self.default_org_id,
            timeout,
            headers: self.headers,
            token_store: self.token_store,
            retry: self.retry,
            refresh: self.refresh,
        })
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

fn parse_url(field: &str, value: &str) -> MinimaxResult<Url> {
    Url::parse(value).map_err(|e| {
        MinimaxError::configuration(format!("invalid {}: {}", field, value)).with_source(e)
    })
}

/// Create a new Minimax configuration builder.
pub fn minimax_config() -> MinimaxConfigBuilder {
    MinimaxConfigBuilder::new()
}
