//! Cookie-carried sessions and the extractors that resolve them to a user.

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};
use domains::User;

use super::error::ApiError;
use super::AppState;

/// How the session cookie is written.
#[derive(Debug, Clone)]
pub struct SessionCookie {
    pub name: String,
    pub secure: bool,
    pub max_age_hours: i64,
}

impl SessionCookie {
    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn issue(&self, token: String) -> String {
        Cookie::build((self.name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(CookieDuration::hours(self.max_age_hours))
            .build()
            .to_string()
    }

    /// `Set-Cookie` value that makes the browser drop the session.
    pub fn clear(&self) -> String {
        Cookie::build((self.name.clone(), ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::ZERO)
            .build()
            .to_string()
    }
}

fn session_token(parts: &Parts, name: &str) -> Option<String> {
    for header in parts.headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse(header).flatten() {
            if cookie.name() == name {
                return Some(cookie.value().to_string());
            }
        }
    }
    None
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(token) = session_token(parts, &state.cookie.name) else {
        return Ok(None);
    };
    let Some(user_id) = state.sessions.verify(&token) else {
        return Ok(None);
    };
    Ok(state.accounts.find(user_id).await?)
}

/// The signed-in user, if any. Invalid or expired cookies count as anonymous.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts, state).await?))
    }
}

/// The signed-in user; anonymous requests are sent to the login page.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve(parts, state).await? {
            Some(user) => Ok(Self(user)),
            None => Err(ApiError::LoginRequired {
                next: parts.uri.path().to_string(),
            }),
        }
    }
}
