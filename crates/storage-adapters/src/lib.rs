//! flashcards/crates/storage-adapters/src/lib.rs
//!
//! Implementations of the persistence, cache and notification ports.
//! Postgres and Telegram are behind features; the in-memory store, the
//! counter cache and the log notifier are always compiled.

pub mod cache;
pub mod memory;
pub mod notify;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use cache::TtlCounterCache;
pub use memory::MemoryStore;
pub use notify::{format_card_created, LogNotifier};

#[cfg(feature = "notify-telegram")]
pub use notify::TelegramNotifier;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
