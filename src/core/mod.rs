//! Core Components
//!
//! Transport boundary shared by the token client and the request pipeline.

pub mod transport;

pub use transport::*;
