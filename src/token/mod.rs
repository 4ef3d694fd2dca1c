//! Token Management
//!
//! Token lifecycle: persistence, the token endpoint client, and refresh
//! coordination.
//!
//! - **Token Storage**: memory, file, environment and callback stores
//! - **OAuth2 Client**: password and refresh-token grants
//! - **Refresh Coordinator**: single-flight refresh with bounded retry

pub mod oauth;
pub mod refresh;
pub mod storage;

pub use oauth::OAuth2Client;
pub use refresh::{RefreshConfig, TokenRefreshCoordinator};
pub use storage::{
    CallbackTokenStore, EnvTokenStore, FileTokenStore, InMemoryTokenStore, TokenStore,
    TokenStoreConfig, DEFAULT_TOKEN_ENV_VAR,
};
