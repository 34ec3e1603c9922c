//! # MORODAS Gateway
//!
//! The HTTP surface of MORODAS OS: the cron-invoked sweep entry point
//! (shared-secret protected, single-flight) and the dashboard API for
//! agents, triggers, schedule previews, and the run audit trail.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
