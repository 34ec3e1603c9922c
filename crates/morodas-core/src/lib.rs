//! # MORODAS Core
//!
//! Shared foundation for the MORODAS OS server: configuration loading and
//! the crate-wide error type. Everything else (scheduler, store, gateway)
//! builds on these.

pub mod config;
pub mod error;

pub use config::MorodasConfig;
pub use error::{MorodasError, Result};
