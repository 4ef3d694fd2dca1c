//! Token Refresh Coordination
//!
//! Hands out a valid token, refreshing it when stale. Concurrent callers that
//! find the token stale share a single refresh.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{MinimaxError, MinimaxResult};
use crate::token::OAuth2Client;
use crate::types::{Token, DEFAULT_TOKEN_BUFFER_MS};

/// Token refresh tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Total refresh attempts, including the first.
    pub max_refresh_attempts: u32,
    /// Wait between refresh attempts.
    pub refresh_retry_delay: Duration,
    /// Tokens expiring within this window are treated as stale.
    pub token_buffer: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_refresh_attempts: 3,
            refresh_retry_delay: Duration::from_millis(1000),
            token_buffer: Duration::from_millis(DEFAULT_TOKEN_BUFFER_MS as u64),
        }
    }
}

impl RefreshConfig {
    pub fn token_buffer_ms(&self) -> i64 {
        i64::try_from(self.token_buffer.as_millis()).unwrap_or(i64::MAX)
    }
}

type RefreshFuture = Shared<BoxFuture<'static, MinimaxResult<Token>>>;

/// Single-flight token refresh.
///
/// The in-flight slot is set before the refresh request is sent and cleared by
/// whichever caller first observes the settled result, so a caller dropping
/// its future never leaves the others waiting on nothing.
pub struct TokenRefreshCoordinator {
    client: Arc<OAuth2Client>,
    config: RefreshConfig,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl TokenRefreshCoordinator {
    pub fn new(client: Arc<OAuth2Client>, config: RefreshConfig) -> Self {
        Self {
            client,
            config,
            in_flight: Mutex::new(None),
        }
    }

    pub fn client(&self) -> &Arc<OAuth2Client> {
        &self.client
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Return a token valid for at least the configured buffer.
    pub async fn get_valid_token(&self) -> MinimaxResult<Token> {
        let refresh = {
            let mut slot = self.in_flight.lock().await;

            match slot.as_ref() {
                Some(pending) if pending.peek().is_none() => {
                    debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                _ => {
                    let stored = self.client.get_token().await?;
                    let refresh_token = match stored {
                        Some(token)
                            if self.client.is_token_valid(
                                Some(&token),
                                self.config.token_buffer_ms(),
                            ) =>
                        {
                            return Ok(token);
                        }
                        Some(token) => token.refresh_token.filter(|t| !t.is_empty()),
                        None => None,
                    };

                    let refresh_token = refresh_token.ok_or_else(|| {
                        MinimaxError::authentication("no valid token and no refresh token")
                    })?;

                    let pending = refresh_with_retry(
                        self.client.clone(),
                        self.config.clone(),
                        refresh_token,
                    )
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        let result = refresh.clone().await;

        let mut slot = self.in_flight.lock().await;
        if slot
            .as_ref()
            .map(|pending| Shared::ptr_eq(pending, &refresh))
            .unwrap_or(false)
        {
            *slot = None;
        }

        result
    }

    /// Whether a refresh is currently in flight.
    pub async fn is_refreshing(&self) -> bool {
        self.in_flight
            .lock()
            .await
            .as_ref()
            .map(|pending| pending.peek().is_none())
            .unwrap_or(false)
    }
}

fn should_retry_refresh(error: &MinimaxError) -> bool {
    error.is_network() || (error.is_authentication() && error.status_code() != Some(401))
}

async fn refresh_with_retry(
    client: Arc<OAuth2Client>,
    config: RefreshConfig,
    refresh_token: String,
) -> MinimaxResult<Token> {
    let max_attempts = config.max_refresh_attempts.max(1);
    let mut attempt = 1;

    loop {
        info!(attempt, max_attempts, "Refreshing access token");

        match client.refresh_token(&refresh_token).await {
            Ok(token) => return Ok(token),
            Err(error) if attempt < max_attempts && should_retry_refresh(&error) => {
                warn!(
                    attempt,
                    code = error.kind().code(),
                    delay_ms = config.refresh_retry_delay.as_millis() as u64,
                    "Token refresh failed, retrying"
                );
                tokio::time::sleep(config.refresh_retry_delay).await;
                attempt += 1;
            }
            Err(error) => {
                warn!(attempt, code = error.kind().code(), "Token refresh failed");
                return Err(error);
            }
        }
    }
}
