//! Resilience
//!
//! Retry policy for API requests.

pub mod retry;

pub use retry::{DefaultRetryPolicy, RetryConfig, RetryPolicy};
