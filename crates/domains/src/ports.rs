//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Join-table access is explicit: the tag repository links and unlinks,
//! nothing is loaded lazily.

use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{CardQuery, Page};
use crate::errors::DomainResult;
use crate::models::{
    Card, CardChanges, CardCreated, CardDetail, CardId, CardStatus, Category, CategoryId,
    CategorySummary, NewCard, NewUser, ProfileChanges, Tag, TagId, User, UserId,
};

/// Persistence contract for cards.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CardRepository: Send + Sync {
    async fn create(&self, card: NewCard) -> DomainResult<Card>;
    /// Fails with `NotFound` when the card does not exist.
    async fn update(&self, id: CardId, changes: CardChanges) -> DomainResult<Card>;
    /// Fails with `NotFound` when the card does not exist.
    async fn delete(&self, id: CardId) -> DomainResult<()>;
    async fn find(&self, id: CardId) -> DomainResult<Option<Card>>;
    async fn find_detail(&self, id: CardId) -> DomainResult<Option<CardDetail>>;
    /// Atomic `views = views + 1`; returns the new value.
    async fn increment_views(&self, id: CardId) -> DomainResult<i64>;
    /// Runs the query, loading categories and tags for the whole page in
    /// one batch. Out-of-range page numbers are `NotFound`.
    async fn list(&self, query: &CardQuery) -> DomainResult<Page<CardDetail>>;
    async fn count(&self) -> DomainResult<i64>;
    /// Returns the number of cards whose row was changed.
    async fn set_status(&self, ids: &[CardId], status: CardStatus) -> DomainResult<u64>;
}

/// Tags and the card/tag join table.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn find(&self, id: TagId) -> DomainResult<Option<Tag>>;
    async fn tags_for_card(&self, card_id: CardId) -> DomainResult<Vec<Tag>>;
    /// Looks a tag up by exact name, inserting it when absent.
    async fn get_or_create(&self, name: &str) -> DomainResult<Tag>;
    /// Idempotent: linking an already linked pair is a no-op.
    async fn link(&self, card_id: CardId, tag_id: TagId) -> DomainResult<()>;
    /// Removes the association only; the tag row stays.
    async fn unlink(&self, card_id: CardId, tag_id: TagId) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list(&self) -> DomainResult<Vec<Category>>;
    async fn list_with_counts(&self) -> DomainResult<Vec<CategorySummary>>;
    async fn find(&self, id: CategoryId) -> DomainResult<Option<Category>>;
    async fn create(&self, name: &str) -> DomainResult<Category>;
    /// Deletes the category together with its cards and their tag links.
    async fn delete(&self, id: CategoryId) -> DomainResult<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// `Conflict` when the username or e-mail is taken.
    async fn create(&self, user: NewUser) -> DomainResult<User>;
    async fn find(&self, id: UserId) -> DomainResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> DomainResult<Option<User>>;
    async fn update_profile(&self, id: UserId, changes: ProfileChanges) -> DomainResult<User>;
    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> DomainResult<()>;
    async fn count(&self) -> DomainResult<i64>;
}

/// Password hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> DomainResult<String>;
    /// `false` for a wrong password and for an unparsable hash alike.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Signed session tokens carried in a cookie.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SessionTokens: Send + Sync {
    fn issue(&self, user_id: UserId) -> DomainResult<String>;
    /// `None` for tampered or expired tokens.
    fn verify(&self, token: &str) -> Option<UserId>;
}

/// Best-effort outbound notifications. Implementations must return
/// immediately and swallow delivery failures.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Notifier: Send + Sync {
    fn card_created(&self, event: CardCreated);
}

/// Small key/value store for cached counters.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CounterCache: Send + Sync {
    /// `None` when the key is missing or expired.
    fn get(&self, key: &str) -> Option<i64>;
    fn set(&self, key: &str, value: i64, ttl: Duration);
    fn invalidate(&self, key: &str);
}
