//! Minimax Client
//!
//! High-level client that wires configuration, transport, token store,
//! session and request pipeline together.

use std::sync::Arc;

use crate::core::{HttpTransport, ReqwestHttpTransport};
use crate::error::MinimaxResult;
use crate::http::HttpClient;
use crate::services::{
    OrganizationsService, ResourceService, CUSTOMERS, EMPLOYEES, ISSUED_INVOICES, JOURNALS,
};
use crate::session::SessionManager;
use crate::token::{OAuth2Client, TokenStore};
use crate::types::{Credentials, MinimaxConfig, SessionState, Token};

/// Minimax API client.
pub struct MinimaxClient {
    config: MinimaxConfig,
    session: Arc<SessionManager>,
    http: Arc<HttpClient>,
}

impl MinimaxClient {
    /// Create a client with the reqwest transport and the configured token store.
    pub fn new(config: MinimaxConfig) -> MinimaxResult<Self> {
        let transport = Arc::new(ReqwestHttpTransport::new(config.timeout)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client from `MINIMAX_*` environment variables.
    pub fn from_env() -> MinimaxResult<Self> {
        Self::new(MinimaxConfig::from_env()?)
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: MinimaxConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let store = config.token_store.build();
        Self::with_components(config, transport, store)
    }

    /// Create a client with a custom transport and token store.
    pub fn with_components(
        config: MinimaxConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let oauth = Arc::new(
            OAuth2Client::new(
                config.auth_url.as_str(),
                config.identity.clone(),
                transport.clone(),
                store,
            )
            .with_timeout(config.timeout),
        );
        let session = Arc::new(SessionManager::new(
            oauth,
            config.refresh.clone(),
            config.default_org_id.clone(),
        ));
        let http = Arc::new(HttpClient::new(config.clone(), transport, session.clone()));

        Self {
            config,
            session,
            http,
        }
    }

    pub fn config(&self) -> &MinimaxConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Request pipeline, for custom calls and interceptor registration.
    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    /// Log in with username and password using the default scope.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> MinimaxResult<Token> {
        self.session
            .login(&Credentials::new(username, password))
            .await
    }

    /// Log in with explicit credentials.
    pub async fn login_with(&self, credentials: &Credentials) -> MinimaxResult<Token> {
        self.session.login(credentials).await
    }

    pub async fn logout(&self) -> MinimaxResult<()> {
        self.session.logout().await
    }

    pub async fn session_state(&self) -> MinimaxResult<SessionState> {
        self.session.get_session_state().await
    }

    pub fn set_organization_id(&self, organization_id: impl Into<String>) {
        self.session.set_organization_id(organization_id);
    }

    pub fn organization_id(&self) -> Option<String> {
        self.session.get_organization_id()
    }

    pub fn customers(&self) -> ResourceService<'_> {
        ResourceService::new(&self.http, CUSTOMERS)
    }

    /// Issued (outgoing) invoices.
    pub fn invoices(&self) -> ResourceService<'_> {
        ResourceService::new(&self.http, ISSUED_INVOICES)
    }

    pub fn journals(&self) -> ResourceService<'_> {
        ResourceService::new(&self.http, JOURNALS)
    }

    pub fn employees(&self) -> ResourceService<'_> {
        ResourceService::new(&self.http, EMPLOYEES)
    }

    pub fn organizations(&self) -> OrganizationsService<'_> {
        OrganizationsService::new(&self.http)
    }
}

impl std::fmt::Debug for MinimaxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinimaxClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Create a client from configuration.
pub fn minimax_client(config: MinimaxConfig) -> MinimaxResult<MinimaxClient> {
    MinimaxClient::new(config)
}
