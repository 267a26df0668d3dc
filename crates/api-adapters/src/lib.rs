//! flashcards/crates/api-adapters/src/lib.rs
//!
//! The HTTP surface: askama page templates, Prometheus metrics and, behind
//! the `web-axum` feature, the axum router with its handlers.

pub mod metrics;
pub mod views;

#[cfg(feature = "web-axum")]
pub mod web;

pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use web::{router, ApiError, AppState, Ports, SessionCookie};
