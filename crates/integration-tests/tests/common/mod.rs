//! Shared fixtures: an in-memory store, seeded rows and a router driven
//! through `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use domains::{
    CardCreated, CardDetail, CardRepository, Category, CategoryRepository, NewCard, NewUser,
    Notifier, SessionTokens, User, UserRepository, UserRole,
};
use services::{parse_tag_input, TagReconciler};
use storage_adapters::{MemoryStore, TtlCounterCache};

pub const PASSWORD: &str = "correct-horse";

/// Keeps every event instead of sending it anywhere.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<CardCreated>>,
}

impl Notifier for RecordingNotifier {
    fn card_created(&self, event: CardCreated) {
        self.events.lock().unwrap().push(event);
    }
}

pub async fn category(store: &MemoryStore, name: &str) -> Category {
    CategoryRepository::create(store, name).await.unwrap()
}

/// A user that cannot log in with a password; tests hand it a session cookie.
pub async fn user(store: &MemoryStore, username: &str, role: UserRole) -> User {
    insert_user(store, username, role, "!".into()).await
}

/// A user whose password is [`PASSWORD`].
pub async fn user_with_password(store: &MemoryStore, username: &str) -> User {
    let hasher = auth_adapters::Argon2Hasher::new();
    let password_hash = domains::PasswordHasher::hash(&hasher, PASSWORD).unwrap();
    insert_user(store, username, UserRole::User, password_hash).await
}

async fn insert_user(store: &MemoryStore, username: &str, role: UserRole, password_hash: String) -> User {
    UserRepository::create(
        store,
        NewUser {
            username: username.into(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash,
            role,
        },
    )
    .await
    .unwrap()
}

/// Stores a card and links the comma-separated `tags`.
pub async fn card(
    store: &MemoryStore,
    category: &Category,
    author: Option<&User>,
    question: &str,
    answer: &str,
    tags: &str,
) -> CardDetail {
    let card = CardRepository::create(
        store,
        NewCard {
            question: question.into(),
            answer: answer.into(),
            category_id: category.id,
            author_id: author.map(|u| u.id),
        },
    )
    .await
    .unwrap();
    let reconciler = TagReconciler::new(Arc::new(store.clone()), Arc::new(store.clone()));
    reconciler
        .reconcile(card.id, &parse_tag_input(tags).unwrap())
        .await
        .unwrap();
    store.find_detail(card.id).await.unwrap().unwrap()
}

#[cfg(feature = "web-axum")]
pub mod http {
    use super::*;

    use api_adapters::{router, AppState, Ports, SessionCookie};
    use auth_adapters::{Argon2Hasher, JwtSessionTokens};
    use axum::body::{to_bytes, Body};
    use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
    use axum::http::{HeaderMap, Method, Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    pub const COOKIE_NAME: &str = "flashcards_session";

    pub struct TestApp {
        pub router: Router,
        pub store: MemoryStore,
        pub sessions: Arc<JwtSessionTokens>,
        pub notifier: Arc<RecordingNotifier>,
    }

    pub struct TestResponse {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: String,
    }

    impl TestResponse {
        pub fn location(&self) -> &str {
            self.headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
        }

        pub fn set_cookie(&self) -> Option<&str> {
            self.headers.get(SET_COOKIE).and_then(|v| v.to_str().ok())
        }
    }

    impl TestApp {
        pub fn new() -> Self {
            let store = MemoryStore::new();
            let sessions = Arc::new(JwtSessionTokens::new(
                b"integration-test-secret-0123456789",
                chrono::Duration::hours(1),
            ));
            let notifier = Arc::new(RecordingNotifier::default());
            let shared = Arc::new(store.clone());
            let ports = Ports {
                cards: shared.clone(),
                tags: shared.clone(),
                categories: shared.clone(),
                users: shared,
                hasher: Arc::new(Argon2Hasher::new()),
                sessions: sessions.clone(),
                notifier: notifier.clone(),
                cache: Arc::new(TtlCounterCache::new()),
            };
            let cookie = SessionCookie {
                name: COOKIE_NAME.into(),
                secure: false,
                max_age_hours: 1,
            };
            // zero TTL keeps the footer counters fresh between requests
            let state = AppState::new(ports, cookie, Duration::ZERO);
            Self {
                router: router(state, "static"),
                store,
                sessions,
                notifier,
            }
        }

        pub fn cookie_for(&self, user: &User) -> String {
            format!("{COOKIE_NAME}={}", self.sessions.issue(user.id).unwrap())
        }

        pub async fn send(&self, request: Request<Body>) -> TestResponse {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            TestResponse {
                status,
                headers,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            }
        }

        pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
            let mut builder = Request::builder().method(Method::GET).uri(uri);
            if let Some(cookie) = cookie {
                builder = builder.header(COOKIE, cookie);
            }
            self.send(builder.body(Body::empty()).unwrap()).await
        }

        pub async fn post_form(&self, uri: &str, body: &str, cookie: Option<&str>) -> TestResponse {
            let mut builder = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
            if let Some(cookie) = cookie {
                builder = builder.header(COOKIE, cookie);
            }
            self.send(builder.body(Body::from(body.to_string())).unwrap())
                .await
        }
    }
}
