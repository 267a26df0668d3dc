//! flashcards/crates/domains/src/lib.rs
//!
//! Entities, errors, catalog query types and the port traits every adapter
//! implements. No I/O lives here.

pub mod catalog;
pub mod errors;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use catalog::*;
pub use errors::*;
pub use models::*;
pub use ports::*;
