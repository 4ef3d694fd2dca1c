//! Session Management
//!
//! Composes the token store, the OAuth2 client and the refresh coordinator,
//! and tracks the selected organization.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::MinimaxResult;
use crate::token::{OAuth2Client, RefreshConfig, TokenRefreshCoordinator};
use crate::types::{Credentials, SessionState, Token};

/// Authenticated session shared by every request of a client.
pub struct SessionManager {
    oauth: Arc<OAuth2Client>,
    coordinator: TokenRefreshCoordinator,
    default_org_id: Option<String>,
    organization_id: RwLock<Option<String>>,
}

impl SessionManager {
    pub fn new(
        oauth: Arc<OAuth2Client>,
        refresh: RefreshConfig,
        default_org_id: Option<String>,
    ) -> Self {
        Self {
            coordinator: TokenRefreshCoordinator::new(oauth.clone(), refresh),
            oauth,
            default_org_id,
            organization_id: RwLock::new(None),
        }
    }

    fn org_read(&self) -> RwLockReadGuard<'_, Option<String>> {
        self.organization_id
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn org_write(&self) -> RwLockWriteGuard<'_, Option<String>> {
        self.organization_id
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Authenticate with the password grant.
    ///
    /// Selects the configured default organization only when none is selected.
    pub async fn login(&self, credentials: &Credentials) -> MinimaxResult<Token> {
        let token = match self.oauth.authenticate(credentials).await {
            Ok(token) => token,
            Err(e) => {
                warn!(username = %credentials.username, code = e.kind().code(), "Login failed");
                return Err(e);
            }
        };

        let mut org = self.org_write();
        if org.is_none() {
            if let Some(default_org) = &self.default_org_id {
                debug!(organization_id = %default_org, "Selecting default organization");
                *org = Some(default_org.clone());
            }
        }

        info!(username = %credentials.username, organization_id = ?org.as_deref(), "Logged in");
        Ok(token)
    }

    /// Forget the token and the selected organization.
    pub async fn logout(&self) -> MinimaxResult<()> {
        self.oauth.clear_token().await?;
        *self.org_write() = None;
        info!("Logged out");
        Ok(())
    }

    /// Current state without triggering a refresh. A stale token is still returned.
    pub async fn get_session_state(&self) -> MinimaxResult<SessionState> {
        let token = self.oauth.get_token().await?;
        let is_authenticated = self.is_valid(token.as_ref());

        Ok(SessionState {
            is_authenticated,
            organization_id: self.get_organization_id(),
            token,
        })
    }

    pub async fn is_authenticated(&self) -> MinimaxResult<bool> {
        let token = self.oauth.get_token().await?;
        Ok(self.is_valid(token.as_ref()))
    }

    /// A usable token, refreshed if needed.
    pub async fn get_auth_token(&self) -> MinimaxResult<Token> {
        self.coordinator.get_valid_token().await.map_err(|e| {
            if e.is_authentication() {
                e.context("session is not authenticated or token refresh failed")
            } else {
                e
            }
        })
    }

    pub fn get_organization_id(&self) -> Option<String> {
        self.org_read().clone()
    }

    pub fn set_organization_id(&self, organization_id: impl Into<String>) {
        *self.org_write() = Some(organization_id.into());
    }

    pub fn clear_organization_id(&self) {
        *self.org_write() = None;
    }

    pub fn default_organization_id(&self) -> Option<&str> {
        self.default_org_id.as_deref()
    }

    pub fn coordinator(&self) -> &TokenRefreshCoordinator {
        &self.coordinator
    }

    fn is_valid(&self, token: Option<&Token>) -> bool {
        self.oauth
            .is_token_valid(token, self.coordinator.config().token_buffer_ms())
    }
}
