//! Session Types

use crate::types::Token;

/// Snapshot of the session, derived on demand from the token store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Whether the stored token is currently usable.
    pub is_authenticated: bool,
    /// Selected organization.
    pub organization_id: Option<String>,
    /// Stored token, returned even when stale.
    pub token: Option<Token>,
}
