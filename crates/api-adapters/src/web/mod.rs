//! Axum wiring: shared state, the route table and the middleware stack.

mod error;
mod handlers;
mod middleware;
mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use domains::{
    CardRepository, CategoryRepository, CounterCache, Notifier, PasswordHasher, SessionTokens,
    TagRepository, UserRepository,
};
use services::{
    AccountService, CardService, CatalogService, ModerationService, SiteService, TagReconciler,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::metrics::Metrics;

pub use error::ApiError;
pub use session::{CurrentUser, MaybeUser, SessionCookie};

/// Adapters the services are built from.
pub struct Ports {
    pub cards: Arc<dyn CardRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub users: Arc<dyn UserRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub sessions: Arc<dyn SessionTokens>,
    pub notifier: Arc<dyn Notifier>,
    pub cache: Arc<dyn CounterCache>,
}

/// State shared by every handler. Cloning is cheap: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub cards: CardService,
    pub moderation: ModerationService,
    pub accounts: AccountService,
    pub site: SiteService,
    pub sessions: Arc<dyn SessionTokens>,
    pub cookie: SessionCookie,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(ports: Ports, cookie: SessionCookie, cache_ttl: Duration) -> Self {
        let reconciler = TagReconciler::new(ports.cards.clone(), ports.tags.clone());
        Self {
            catalog: CatalogService::new(
                ports.cards.clone(),
                ports.tags.clone(),
                ports.categories.clone(),
            ),
            cards: CardService::new(
                ports.cards.clone(),
                ports.categories.clone(),
                reconciler,
                ports.notifier,
            ),
            moderation: ModerationService::new(ports.cards.clone(), ports.categories.clone()),
            accounts: AccountService::new(ports.users.clone(), ports.hasher),
            site: SiteService::new(ports.cards, ports.users, ports.cache, cache_ttl),
            sessions: ports.sessions,
            cookie,
            metrics: Arc::new(Metrics::new()),
        }
    }
}

/// Builds the full application router.
pub fn router(state: AppState, static_dir: &str) -> Router {
    use handlers::{accounts, admin, cards, catalog, ops, pages};

    Router::new()
        .route("/", get(pages::index))
        .route("/about/", get(pages::about))
        // Catalog
        .route("/cards/catalog/", get(catalog::catalog))
        .route("/cards/categories/", get(catalog::categories))
        .route("/cards/categories/{id}/", get(catalog::category))
        .route("/cards/tags/{id}/", get(catalog::tag))
        // Cards
        .route("/cards/add/", get(cards::add_form).post(cards::add))
        .route("/cards/{id}/detail/", get(cards::detail))
        .route("/cards/{id}/edit/", get(cards::edit_form).post(cards::edit))
        .route("/cards/{id}/delete/", get(cards::delete_confirm).post(cards::delete))
        // Accounts
        .route("/users/login/", get(accounts::login_form).post(accounts::login))
        .route("/users/logout/", post(accounts::logout))
        .route("/users/register/", get(accounts::register_form).post(accounts::register))
        .route("/users/thanks/", get(accounts::thanks))
        .route("/users/profile/", get(accounts::profile_form).post(accounts::profile))
        .route(
            "/users/password-change/",
            get(accounts::password_form).post(accounts::password_change),
        )
        .route("/users/password-change/done/", get(accounts::password_done))
        .route("/users/cards/", get(accounts::my_cards))
        // Moderation back-office
        .route("/admin/cards/", get(admin::card_list))
        .route("/admin/cards/action/", post(admin::bulk_action))
        .route("/admin/cards/{id}/", get(admin::edit_form).post(admin::edit))
        .route(
            "/admin/categories/",
            get(admin::categories).post(admin::create_category),
        )
        .route("/admin/categories/{id}/delete/", post(admin::delete_category))
        // Operations
        .route("/metrics", get(ops::metrics))
        .route("/health", get(ops::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(ops::not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state)
}
