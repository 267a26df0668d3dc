//! Seeds a fresh database with an admin account and the starter categories.
//!
//! `SEED_ADMIN_PASSWORD` is required; `SEED_ADMIN_USERNAME` defaults to
//! `admin`. Running it twice is harmless.

use std::collections::HashSet;

use anyhow::Context;
use auth_adapters::Argon2Hasher;
use configs::Settings;
use domains::{CategoryRepository, NewUser, PasswordHasher, UserRepository, UserRole};
use secrecy::ExposeSecret;
use storage_adapters::PgStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const STARTER_CATEGORIES: &[&str] = &["Python", "Rust", "Databases", "Algorithms", "Networking"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().context("loading settings")?;
    let store = PgStore::connect(settings.database.url.expose_secret(), 2).await?;
    store.migrate().await?;

    let username = std::env::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    if store.find_by_username(&username).await?.is_none() {
        let password = std::env::var("SEED_ADMIN_PASSWORD").context("SEED_ADMIN_PASSWORD must be set")?;
        let password_hash = Argon2Hasher::new().hash(&password)?;
        let admin = UserRepository::create(
            &store,
            NewUser {
                username: username.clone(),
                email: None,
                first_name: String::new(),
                last_name: String::new(),
                password_hash,
                role: UserRole::Admin,
            },
        )
        .await?;
        info!(user_id = admin.id, %username, "admin created");
    } else {
        info!(%username, "admin already exists");
    }

    let existing: HashSet<String> = CategoryRepository::list(&store)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    for name in STARTER_CATEGORIES.iter().filter(|n| !existing.contains(**n)) {
        let category = CategoryRepository::create(&store, name).await?;
        info!(category_id = category.id, %name, "category created");
    }
    Ok(())
}
