//! OAuth2 Client
//!
//! Password and refresh-token grants against the token endpoint.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};
use crate::error::{parse_error_response, MinimaxError, MinimaxResult};
use crate::token::TokenStore;
use crate::types::{now_ms, ClientIdentity, Credentials, Token, TokenResponse};

/// Token endpoint client. Every issued token is persisted before it is returned.
pub struct OAuth2Client {
    auth_url: String,
    identity: ClientIdentity,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    timeout: Option<Duration>,
}

impl OAuth2Client {
    pub fn new(
        auth_url: impl Into<String>,
        identity: ClientIdentity,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            identity,
            transport,
            store,
            timeout: None,
        }
    }

    /// Per-request timeout for token calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Password grant.
    pub async fn authenticate(&self, credentials: &Credentials) -> MinimaxResult<Token> {
        debug!(username = %credentials.username, "Requesting token with password grant");

        let params = [
            ("grant_type", "password"),
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.expose_secret()),
            ("username", credentials.username.as_str()),
            ("password", credentials.expose_password()),
            ("scope", credentials.scope.as_str()),
        ];

        let response = self.request_token(&params).await?;
        let token = Token::from_response(response, now_ms());
        self.store.save(&token).await?;

        info!(username = %credentials.username, expires_in = ?token.expires_in, "Authenticated");
        Ok(token)
    }

    /// Refresh-token grant.
    ///
    /// When the server does not rotate the refresh token, the one used is kept.
    pub async fn refresh_token(&self, refresh_token: &str) -> MinimaxResult<Token> {
        debug!("Requesting token with refresh grant");

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.expose_secret()),
            ("refresh_token", refresh_token),
        ];

        let response = self.request_token(&params).await?;
        let mut token = Token::from_response(response, now_ms());
        if !token.has_refresh_token() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        self.store.save(&token).await?;

        info!(expires_in = ?token.expires_in, "Token refreshed");
        Ok(token)
    }

    /// Whether `token` is usable now with the given safety buffer.
    pub fn is_token_valid(&self, token: Option<&Token>, buffer_ms: i64) -> bool {
        self.is_token_valid_at(token, buffer_ms, now_ms())
    }

    /// Same as [`Self::is_token_valid`] with an explicit clock.
    pub fn is_token_valid_at(&self, token: Option<&Token>, buffer_ms: i64, now_ms: i64) -> bool {
        token
            .map(|t| t.is_valid_at(now_ms, buffer_ms))
            .unwrap_or(false)
    }

    /// Stored token, without validation.
    pub async fn get_token(&self) -> MinimaxResult<Option<Token>> {
        self.store.load().await
    }

    pub async fn clear_token(&self) -> MinimaxResult<()> {
        self.store.clear().await
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> MinimaxResult<TokenResponse> {
        let body = serde_urlencoded::to_string(params).map_err(|e| {
            MinimaxError::authentication("failed to encode token request").with_source(e)
        })?;

        let mut request = HttpRequest::new(HttpMethod::Post, self.auth_url.clone());
        request.headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        request
            .headers
            .insert("Accept".to_string(), "application/json".to_string());
        request.body = Some(body);
        request.timeout = self.timeout;

        match self.transport.send(request).await {
            Ok(response) if response.is_success() => parse_token_response(&response),
            Ok(response) => Err(classify_token_failure(&response)),
            Err(TransportError::NoResponse { message, timed_out }) => {
                warn!(timed_out, "Token endpoint unreachable");
                let message = format!("token endpoint unreachable: {}", message);
                Err(if timed_out {
                    MinimaxError::timeout(message)
                } else {
                    MinimaxError::network(message)
                })
            }
            Err(TransportError::Other { message }) => Err(MinimaxError::authentication(format!(
                "token request failed: {}",
                message
            ))),
        }
    }
}

fn parse_token_response(response: &HttpResponse) -> MinimaxResult<TokenResponse> {
    serde_json::from_str::<TokenResponse>(&response.body).map_err(|e| {
        MinimaxError::authentication(format!("invalid token response: {}", e))
            .with_status(response.status)
            .with_source(e)
    })
}

fn classify_token_failure(response: &HttpResponse) -> MinimaxError {
    let message = parse_error_response(&response.body)
        .and_then(|body| body.oauth_message())
        .filter(|m| !m.trim().is_empty());

    let error = match response.status {
        400 | 401 => MinimaxError::authentication(
            message.unwrap_or_else(|| "authentication failed".to_string()),
        ),
        status => MinimaxError::server(
            message.unwrap_or_else(|| format!("token endpoint returned HTTP {}", status)),
        ),
    };

    warn!(status = response.status, code = error.kind().code(), "Token request rejected");
    error.with_status(response.status)
}
