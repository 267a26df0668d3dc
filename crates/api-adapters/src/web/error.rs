//! Maps domain failures onto HTTP responses.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use domains::DomainError;
use thiserror::Error;
use tracing::{error, warn};

use crate::views::{query_url, ErrorPage};

pub const LOGIN_PATH: &str = "/users/login/";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// No session on a page that needs one; `next` is the page asked for
    #[error("login required")]
    LoginRequired { next: String },

    #[error("template rendering failed: {0}")]
    Render(#[from] askama::Error),
}

pub fn login_url(next: &str) -> String {
    query_url(LOGIN_PATH, &[("next", next.to_string())])
}

/// Renders `page`, turning template failures into a 500.
pub fn render<T: Template>(page: &T) -> Result<Html<String>, ApiError> {
    Ok(Html(page.render()?))
}

pub fn error_response(status: StatusCode, message: String) -> Response {
    let page = ErrorPage {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Error").to_string(),
        message,
    };
    match page.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            error!(error = %err, "error page failed to render");
            (status, page.message).into_response()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::LoginRequired { next } => return Redirect::to(&login_url(&next)).into_response(),
            ApiError::Domain(DomainError::Unauthorized) => {
                return Redirect::to(LOGIN_PATH).into_response()
            }
            ApiError::Domain(err @ DomainError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ApiError::Domain(DomainError::Validation(errors)) => {
                (StatusCode::BAD_REQUEST, errors.to_string())
            }
            ApiError::Domain(DomainError::Forbidden(msg)) => {
                warn!(reason = %msg, "forbidden");
                (
                    StatusCode::FORBIDDEN,
                    "You do not have permission to do that.".to_string(),
                )
            }
            ApiError::Domain(DomainError::Conflict(msg)) => (StatusCode::CONFLICT, msg),
            ApiError::Domain(DomainError::Internal(msg)) => {
                error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong on our side.".to_string(),
                )
            }
            ApiError::Render(err) => {
                error!(error = %err, "template rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong on our side.".to_string(),
                )
            }
        };
        error_response(status, message)
    }
}
