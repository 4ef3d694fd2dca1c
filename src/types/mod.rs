//! Minimax Types
//!
//! Token, configuration, session and resource types.

pub mod config;
pub mod resource;
pub mod session;
pub mod token;

pub use config::*;
pub use resource::*;
pub use session::*;
pub use token::*;
