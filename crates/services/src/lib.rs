//! flashcards/crates/services/src/lib.rs
//!
//! Use cases of the catalog. Services depend on port traits only; the binary
//! decides which adapters sit behind them.

pub mod accounts;
pub mod cards;
pub mod catalog;
pub mod markdown;
pub mod moderation;
pub mod site;
pub mod tags;

pub use accounts::{AccountService, LoginForm, PasswordChangeForm, ProfileForm, RegistrationForm};
pub use cards::{validate_card_form, CardForm, CardService, ValidCard};
pub use catalog::{build_query, parse_page, CatalogParams, CatalogService};
pub use markdown::render_markdown;
pub use moderation::{
    CategoryForm, ModerationAction, ModerationParams, ModerationService, ModeratorCardForm,
    UploadWindow,
};
pub use site::{MenuItem, PageContext, SiteService, DEFAULT_CACHE_TTL, MENU};
pub use tags::{parse_tag_input, TagReconciler};
