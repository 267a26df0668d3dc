//! Data shared by every page: the menu and the cached site-wide counters.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use domains::{CardRepository, CounterCache, DomainResult, UserRepository};
use tracing::debug;

pub const CARDS_COUNT_KEY: &str = "cards_count";
pub const USERS_COUNT_KEY: &str = "users_count";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub title: &'static str,
    pub url: &'static str,
}

pub const MENU: &[MenuItem] = &[
    MenuItem {
        title: "Home",
        url: "/",
    },
    MenuItem {
        title: "About",
        url: "/about/",
    },
    MenuItem {
        title: "Catalog",
        url: "/cards/catalog/",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub menu: &'static [MenuItem],
    pub cards_count: i64,
    pub users_count: i64,
}

#[derive(Clone)]
pub struct SiteService {
    cards: Arc<dyn CardRepository>,
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn CounterCache>,
    ttl: Duration,
}

impl SiteService {
    pub fn new(
        cards: Arc<dyn CardRepository>,
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn CounterCache>,
        ttl: Duration,
    ) -> Self {
        Self {
            cards,
            users,
            cache,
            ttl,
        }
    }

    /// Built explicitly by every page handler.
    pub async fn page_context(&self) -> DomainResult<PageContext> {
        let cards_count = self
            .read_through(CARDS_COUNT_KEY, || self.cards.count())
            .await?;
        let users_count = self
            .read_through(USERS_COUNT_KEY, || self.users.count())
            .await?;
        Ok(PageContext {
            menu: MENU,
            cards_count,
            users_count,
        })
    }

    /// Drops the cached counters so the next page shows fresh numbers.
    pub fn invalidate_counts(&self) {
        self.cache.invalidate(CARDS_COUNT_KEY);
        self.cache.invalidate(USERS_COUNT_KEY);
    }

    async fn read_through<F, Fut>(&self, key: &str, load: F) -> DomainResult<i64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DomainResult<i64>>,
    {
        if let Some(value) = self.cache.get(key) {
            return Ok(value);
        }
        let value = load().await?;
        debug!(key, value, "counter cache miss");
        self.cache.set(key, value, self.ttl);
        Ok(value)
    }
}
