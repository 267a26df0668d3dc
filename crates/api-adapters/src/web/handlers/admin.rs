//! Moderation back-office: review list, bulk status actions, card edit and
//! category management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use domains::{CardId, CategoryId, DomainError, User, ValidationErrors};
use services::{CategoryForm, ModerationAction, ModerationParams, ModeratorCardForm};

use super::{layout, NoticeParam};
use crate::views::{
    category_options, query_url, AdminCardFormPage, AdminCardsPage, AdminCategoriesPage,
    AdminFilters, CardSummary, Pager,
};
use crate::web::error::{render, ApiError};
use crate::web::session::CurrentUser;
use crate::web::AppState;

const CARDS_PATH: &str = "/admin/cards/";
const CATEGORIES_PATH: &str = "/admin/categories/";

fn with_notice(path: &str, notice: String) -> Redirect {
    Redirect::to(&query_url(path, &[("notice", notice)]))
}

pub async fn card_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ModerationParams>,
    Query(notice): Query<NoticeParam>,
) -> Result<Html<String>, ApiError> {
    let page = state.moderation.review_list(&user, &params).await?;
    let categories = state.moderation.categories(&user).await?;
    let filters = AdminFilters::from_params(&params);
    let layout = layout(&state, "Review cards", Some(&user))
        .await?
        .with_notice(notice.notice);
    render(&AdminCardsPage {
        layout,
        cards: CardSummary::list(&page),
        pager: Pager::new(&page, CARDS_PATH, &filters.as_params()),
        categories: category_options(&categories, &filters.category),
        filters,
    })
}

/// Bulk form: one `action` plus any number of repeated `ids` fields.
pub async fn bulk_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Redirect, ApiError> {
    let mut action = None;
    let mut ids = Vec::new();
    for (key, value) in &fields {
        match key.as_str() {
            "action" => action = Some(value.as_str()),
            "ids" => {
                let id = value
                    .parse::<CardId>()
                    .map_err(|_| DomainError::invalid("ids", "card ids must be numbers"))?;
                ids.push(id);
            }
            _ => {}
        }
    }
    let action = ModerationAction::parse(action.unwrap_or_default())?;

    match state.moderation.apply(&user, action, &ids).await {
        Ok(changed) => {
            let plural = if changed == 1 { "" } else { "s" };
            let notice = format!(
                "{changed} card{plural} marked as {}",
                action.target().label().to_lowercase()
            );
            Ok(with_notice(CARDS_PATH, notice))
        }
        Err(DomainError::Validation(errors)) => Ok(with_notice(CARDS_PATH, errors.to_string())),
        Err(err) => Err(err.into()),
    }
}

async fn card_form_page(
    state: &AppState,
    user: &User,
    card_id: CardId,
    form: ModeratorCardForm,
    errors: ValidationErrors,
) -> Result<Html<String>, ApiError> {
    let categories = state.moderation.categories(user).await?;
    let layout = layout(state, "Moderate card", Some(user)).await?;
    render(&AdminCardFormPage {
        layout,
        card_id,
        checked: form.status.is_some(),
        categories: category_options(&categories, &form.category),
        form,
        errors,
    })
}

pub async fn edit_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CardId>,
) -> Result<Html<String>, ApiError> {
    let detail = state.moderation.card(&user, id).await?;
    card_form_page(
        &state,
        &user,
        id,
        ModeratorCardForm::from_detail(&detail),
        ValidationErrors::new(),
    )
    .await
}

pub async fn edit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CardId>,
    Form(form): Form<ModeratorCardForm>,
) -> Result<Response, ApiError> {
    match state.moderation.edit(&user, id, &form).await {
        Ok(_) => Ok(with_notice(CARDS_PATH, format!("Card {id} saved")).into_response()),
        Err(DomainError::Validation(errors)) => {
            let page = card_form_page(&state, &user, id, form, errors).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

async fn categories_page(
    state: &AppState,
    user: &User,
    name: String,
    errors: ValidationErrors,
    notice: Option<String>,
) -> Result<Html<String>, ApiError> {
    let categories = state.moderation.categories(user).await?;
    let layout = layout(state, "Categories", Some(user))
        .await?
        .with_notice(notice);
    render(&AdminCategoriesPage {
        layout,
        categories,
        name,
        errors,
    })
}

pub async fn categories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(notice): Query<NoticeParam>,
) -> Result<Html<String>, ApiError> {
    categories_page(&state, &user, String::new(), ValidationErrors::new(), notice.notice).await
}

pub async fn create_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<CategoryForm>,
) -> Result<Response, ApiError> {
    match state.moderation.create_category(&user, &form).await {
        Ok(category) => {
            Ok(with_notice(CATEGORIES_PATH, format!("Category \"{}\" created", category.name)).into_response())
        }
        Err(DomainError::Validation(errors)) => {
            let page = categories_page(&state, &user, form.name, errors, None).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn delete_category(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CategoryId>,
) -> Result<Redirect, ApiError> {
    state.moderation.delete_category(&user, id).await?;
    state.site.invalidate_counts();
    Ok(with_notice(CATEGORIES_PATH, format!("Category {id} deleted with its cards")))
}
