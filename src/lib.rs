//! Minimax Integration Module
//!
//! Typed async client for the Minimax accounting API.
//!
//! # Features
//!
//! - OAuth2 password grant with transparent token refresh
//! - Single-flight refresh shared by concurrent callers
//! - Memory, file, environment and callback token stores
//! - Organization-scoped requests
//! - RowVersion optimistic concurrency support
//! - Typed errors with a pluggable classifier chain
//! - Exponential backoff retry with jitter
//!
//! # Example
//!
//! ```rust,ignore
//! use integrations_minimax::{minimax_config, MinimaxClient, ListParams};
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = minimax_config()
//!         .client_id("my-client-id")
//!         .client_secret("my-client-secret")
//!         .default_org_id("12345")
//!         .build()?;
//!
//!     let client = MinimaxClient::new(config)?;
//!     client.login("user@example.com", "password").await?;
//!
//!     let customers = client.customers();
//!     let page = customers.list::<Value>(&ListParams::page(1, 50)).await?;
//!
//!     if let Some(first) = page.rows.first() {
//!         let id = first["CustomerId"].to_string();
//!         match customers.update::<Value, _>(&id, first, &json!({"Name": "Renamed"})).await {
//!             Err(e) if e.is_concurrency() => {
//!                 println!("conflict, server has {:?}", e.current_row_version());
//!             }
//!             other => { other?; }
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: tokens, configuration, session and resource wire types
//! - `error`: error taxonomy
//! - `core`: HTTP transport boundary
//! - `token`: token stores, OAuth2 client and refresh coordination
//! - `session`: session manager
//! - `http`: request pipeline, interceptors and error middleware
//! - `resilience`: retry policy
//! - `services`: resource services
//! - `builders`: fluent configuration builder
//! - `client`: high-level client

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod http;
pub mod resilience;
pub mod services;
pub mod session;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{minimax_client, MinimaxClient};

// Re-export builders
pub use builders::{minimax_config, MinimaxConfigBuilder};

// Re-export errors
pub use error::{
    extract_row_version, parse_error_response, ApiErrorBody, ErrorKind, MinimaxError,
    MinimaxResult,
};

// Re-export types
pub use types::{
    // Config
    ClientIdentity, MinimaxConfig, DEFAULT_AUTH_URL, DEFAULT_BASE_URL, ORGANIZATION_HEADER,
    // Token
    Credentials, Token, TokenResponse,
    // Session
    SessionState,
    // Resource
    ListParams, OrganizationRef, PagedResult, UserOrganization,
};

// Re-export core components
pub use core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, RequestFailure,
    ReqwestHttpTransport, TransportError,
};

// Re-export token management
pub use token::{
    CallbackTokenStore, EnvTokenStore, FileTokenStore, InMemoryTokenStore, OAuth2Client,
    RefreshConfig, TokenRefreshCoordinator, TokenStore, TokenStoreConfig,
};

// Re-export session
pub use session::SessionManager;

// Re-export pipeline
pub use http::{
    add_row_version, ApiRequest, ConcurrencyClassifier, ErrorMiddleware, ErrorMiddlewareChain,
    HttpClient, LoggingInterceptor, Next, RequestInterceptor, RequestOptions,
    ResponseInterceptor, RowVersionInterceptor,
};

// Re-export resilience
pub use resilience::{DefaultRetryPolicy, RetryConfig, RetryPolicy};

// Re-export services
pub use services::{OrganizationsService, ResourceService};
