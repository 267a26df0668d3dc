//! # Flashcards binary
//!
//! Assembles the application from the adapters selected at compile time and
//! serves it until Ctrl-C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{router, AppState, Ports, SessionCookie};
use auth_adapters::{Argon2Hasher, JwtSessionTokens};
use configs::{LogFormat, Settings, TelegramSettings};
use domains::Notifier;
use secrecy::ExposeSecret;
use storage_adapters::{LogNotifier, TtlCounterCache};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[cfg(feature = "db-postgres")]
async fn storage(settings: &Settings) -> anyhow::Result<storage_adapters::PgStore> {
    let store = storage_adapters::PgStore::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await?;
    if settings.database.run_migrations {
        store.migrate().await?;
        info!("migrations applied");
    }
    Ok(store)
}

#[cfg(not(feature = "db-postgres"))]
async fn storage(_settings: &Settings) -> anyhow::Result<storage_adapters::MemoryStore> {
    tracing::warn!("built without db-postgres: data lives in memory only");
    Ok(storage_adapters::MemoryStore::new())
}

#[cfg(feature = "notify-telegram")]
fn telegram_notifier(telegram: &TelegramSettings) -> anyhow::Result<Option<Arc<dyn Notifier>>> {
    let (true, Some(token), Some(chat_id)) = (telegram.enabled, &telegram.bot_token, &telegram.chat_id) else {
        return Ok(None);
    };
    let notifier = storage_adapters::TelegramNotifier::new(
        &telegram.api_base,
        token.expose_secret(),
        chat_id.clone(),
        Duration::from_secs(telegram.timeout_seconds),
    )
    .context("building the Telegram client")?;
    info!("card notifications go to Telegram");
    Ok(Some(Arc::new(notifier)))
}

#[cfg(not(feature = "notify-telegram"))]
fn telegram_notifier(telegram: &TelegramSettings) -> anyhow::Result<Option<Arc<dyn Notifier>>> {
    if telegram.enabled {
        tracing::warn!("telegram.enabled is set but this build has no Telegram support");
    }
    Ok(None)
}

fn notifier(settings: &Settings) -> anyhow::Result<Arc<dyn Notifier>> {
    Ok(telegram_notifier(&settings.telegram)?.unwrap_or_else(|| Arc::new(LogNotifier)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings);

    let store = Arc::new(storage(&settings).await?);
    let sessions = JwtSessionTokens::new(
        settings.auth.session_secret.expose_secret().as_bytes(),
        chrono::Duration::hours(settings.auth.session_ttl_hours),
    );

    let ports = Ports {
        cards: store.clone(),
        tags: store.clone(),
        categories: store.clone(),
        users: store,
        hasher: Arc::new(Argon2Hasher::new()),
        sessions: Arc::new(sessions),
        notifier: notifier(&settings)?,
        cache: Arc::new(TtlCounterCache::new()),
    };
    let cookie = SessionCookie {
        name: settings.auth.cookie_name.clone(),
        secure: settings.auth.secure_cookie,
        max_age_hours: settings.auth.session_ttl_hours,
    };
    let state = AppState::new(ports, cookie, Duration::from_secs(settings.cache.ttl_seconds));
    let app = router(state, &settings.server.static_dir);

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!(%address, "flashcards listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

