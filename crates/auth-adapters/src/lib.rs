//! flashcards/crates/auth-adapters/src/lib.rs
//!
//! Password hashing (always compiled) and signed session tokens
//! (feature `auth-jwt`).

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2Hasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::JwtSessionTokens;
