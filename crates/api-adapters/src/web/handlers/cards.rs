//! Card detail plus the author's create / edit / delete pages.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use domains::{CardId, DomainError, User, ValidationErrors};
use services::{render_markdown, CardForm};

use super::layout;
use crate::views::{category_options, CardDeletePage, CardDetailPage, CardFormPage, CardSummary};
use crate::web::error::{render, ApiError};
use crate::web::session::{CurrentUser, MaybeUser};
use crate::web::AppState;

fn detail_url(id: CardId) -> String {
    format!("/cards/{id}/detail/")
}

async fn form_page(
    state: &AppState,
    user: &User,
    heading: &str,
    action: String,
    form: CardForm,
    errors: ValidationErrors,
) -> Result<Html<String>, ApiError> {
    let categories = state.cards.categories().await?;
    let layout = layout(state, heading, Some(user)).await?;
    render(&CardFormPage {
        layout,
        heading: heading.to_string(),
        action,
        categories: category_options(&categories, &form.category),
        form,
        errors,
    })
}

pub async fn detail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<CardId>,
) -> Result<Html<String>, ApiError> {
    let detail = state.cards.view(id).await?;
    state.metrics.record_card_view();
    let can_manage = user.as_ref().is_some_and(|u| u.can_manage(&detail.card));
    let layout = layout(&state, &detail.card.question, user.as_ref()).await?;
    render(&CardDetailPage {
        layout,
        answer_html: render_markdown(&detail.card.answer),
        card: CardSummary::from_detail(&detail),
        can_manage,
    })
}

pub async fn add_form(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Html<String>, ApiError> {
    form_page(
        &state,
        &user,
        "Add a card",
        "/cards/add/".into(),
        CardForm::default(),
        ValidationErrors::new(),
    )
    .await
}

pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CardForm>,
) -> Result<Response, ApiError> {
    match state.cards.create(&user, &form).await {
        Ok(detail) => {
            state.site.invalidate_counts();
            Ok(Redirect::to(&detail_url(detail.card.id)).into_response())
        }
        Err(DomainError::Validation(errors)) => {
            let page = form_page(&state, &user, "Add a card", "/cards/add/".into(), form, errors).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CardId>,
) -> Result<Html<String>, ApiError> {
    let detail = state.cards.for_edit(&user, id).await?;
    form_page(
        &state,
        &user,
        "Edit card",
        format!("/cards/{id}/edit/"),
        CardForm::from_detail(&detail),
        ValidationErrors::new(),
    )
    .await
}

pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CardId>,
    Form(form): Form<CardForm>,
) -> Result<Response, ApiError> {
    match state.cards.update(&user, id, &form).await {
        Ok(_) => Ok(Redirect::to(&detail_url(id)).into_response()),
        Err(DomainError::Validation(errors)) => {
            let action = format!("/cards/{id}/edit/");
            let page = form_page(&state, &user, "Edit card", action, form, errors).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn delete_confirm(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CardId>,
) -> Result<Html<String>, ApiError> {
    let detail = state.cards.for_edit(&user, id).await?;
    let layout = layout(&state, "Delete card", Some(&user)).await?;
    render(&CardDeletePage {
        layout,
        card: CardSummary::from_detail(&detail),
    })
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CardId>,
) -> Result<Redirect, ApiError> {
    state.cards.delete(&user, id).await?;
    state.site.invalidate_counts();
    Ok(Redirect::to("/cards/catalog/"))
}
