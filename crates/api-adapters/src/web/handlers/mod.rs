pub mod accounts;
pub mod admin;
pub mod cards;
pub mod catalog;
pub mod ops;
pub mod pages;

use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Redirect, Response};
use domains::User;
use serde::Deserialize;

use super::error::ApiError;
use super::AppState;
use crate::views::Layout;

/// `?notice=` carried across a redirect.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeParam {
    pub notice: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParam {
    pub page: Option<String>,
}

/// Shared layout of every page: menu, cached counters and the user badge.
pub async fn layout(state: &AppState, title: &str, user: Option<&User>) -> Result<Layout, ApiError> {
    let ctx = state.site.page_context().await?;
    Ok(Layout::new(title, ctx, user))
}

/// 303 to `to` while setting a cookie.
pub fn redirect_with_cookie(to: &str, cookie: String) -> Response {
    ([(SET_COOKIE, cookie)], Redirect::to(to)).into_response()
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_must_stay_on_site() {
        assert_eq!(safe_next(Some("/cards/add/")), "/cards/add/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
