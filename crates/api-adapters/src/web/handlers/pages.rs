use axum::extract::State;
use axum::response::Html;

use super::layout;
use crate::views::{AboutPage, IndexPage};
use crate::web::error::{render, ApiError};
use crate::web::session::MaybeUser;
use crate::web::AppState;

pub async fn index(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Html<String>, ApiError> {
    let layout = layout(&state, "Home", user.as_ref()).await?;
    render(&IndexPage { layout })
}

pub async fn about(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Html<String>, ApiError> {
    let layout = layout(&state, "About", user.as_ref()).await?;
    render(&AboutPage { layout })
}
