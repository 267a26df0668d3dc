//! Login, registration, profile and the user's own card list.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use domains::{DomainError, ValidationErrors};
use services::{LoginForm, PasswordChangeForm, ProfileForm, RegistrationForm};
use serde::Deserialize;
use tracing::info;

use super::{layout, redirect_with_cookie, safe_next, NoticeParam, PageParam};
use crate::views::{
    CardSummary, LoginPage, MessagePage, MyCardsPage, Pager, PasswordChangePage, ProfilePage,
    RegisterPage,
};
use crate::web::error::{render, ApiError};
use crate::web::session::{CurrentUser, MaybeUser};
use crate::web::AppState;

const JOINED_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

async fn message_page(
    state: &AppState,
    user: Option<&domains::User>,
    title: &str,
    message: &str,
    link: (&str, &str),
) -> Result<Html<String>, ApiError> {
    let layout = layout(state, title, user).await?;
    render(&MessagePage {
        layout,
        message: message.to_string(),
        link_url: link.0.to_string(),
        link_text: link.1.to_string(),
    })
}

pub async fn login_form(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(params): Query<NextParam>,
) -> Result<Html<String>, ApiError> {
    let layout = layout(&state, "Log in", user.as_ref()).await?;
    render(&LoginPage {
        layout,
        username: String::new(),
        next: params.next.unwrap_or_default(),
        errors: ValidationErrors::new(),
    })
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Result<Response, ApiError> {
    match state.accounts.authenticate(&form.username, &form.password).await {
        Ok(user) => {
            let token = state.sessions.issue(user.id)?;
            info!(user_id = user.id, "user logged in");
            let to = safe_next(form.next.as_deref()).to_string();
            Ok(redirect_with_cookie(&to, state.cookie.issue(token)))
        }
        Err(DomainError::Validation(errors)) => {
            let layout = layout(&state, "Log in", None).await?;
            let page = render(&LoginPage {
                layout,
                username: form.username,
                next: form.next.unwrap_or_default(),
                errors,
            })?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(State(state): State<AppState>) -> Response {
    redirect_with_cookie("/", state.cookie.clear())
}

pub async fn register_form(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Html<String>, ApiError> {
    let layout = layout(&state, "Register", user.as_ref()).await?;
    render(&RegisterPage {
        layout,
        form: RegistrationForm::default(),
        errors: ValidationErrors::new(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, ApiError> {
    match state.accounts.register(&form).await {
        Ok(_) => {
            state.site.invalidate_counts();
            Ok(Redirect::to("/users/thanks/").into_response())
        }
        Err(DomainError::Validation(errors)) => {
            let layout = layout(&state, "Register", None).await?;
            let form = RegistrationForm {
                password1: String::new(),
                password2: String::new(),
                ..form
            };
            let page = render(&RegisterPage { layout, form, errors })?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn thanks(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Html<String>, ApiError> {
    message_page(
        &state,
        user.as_ref(),
        "Thanks",
        "Thank you for registering. You can log in now.",
        ("/users/login/", "Log in"),
    )
    .await
}

async fn profile_page(
    state: &AppState,
    user: &domains::User,
    form: ProfileForm,
    errors: ValidationErrors,
    notice: Option<String>,
) -> Result<Html<String>, ApiError> {
    let layout = layout(state, "Profile", Some(user)).await?.with_notice(notice);
    render(&ProfilePage {
        layout,
        username: user.username.clone(),
        is_moderator: user.role.can_moderate(),
        joined: user.date_joined.format(JOINED_FORMAT).to_string(),
        form,
        errors,
    })
}

pub async fn profile_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(notice): Query<NoticeParam>,
) -> Result<Html<String>, ApiError> {
    let form = ProfileForm::from_user(&user);
    profile_page(&state, &user, form, ValidationErrors::new(), notice.notice).await
}

pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ProfileForm>,
) -> Result<Response, ApiError> {
    match state.accounts.update_profile(&user, &form).await {
        Ok(_) => Ok(Redirect::to("/users/profile/?notice=Profile+saved").into_response()),
        Err(DomainError::Validation(errors)) => {
            let page = profile_page(&state, &user, form, errors, None).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn password_form(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Html<String>, ApiError> {
    let layout = layout(&state, "Change password", Some(&user)).await?;
    render(&PasswordChangePage {
        layout,
        form: PasswordChangeForm::default(),
        errors: ValidationErrors::new(),
    })
}

pub async fn password_change(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<PasswordChangeForm>,
) -> Result<Response, ApiError> {
    match state.accounts.change_password(&user, &form).await {
        Ok(()) => Ok(Redirect::to("/users/password-change/done/").into_response()),
        Err(DomainError::Validation(errors)) => {
            let layout = layout(&state, "Change password", Some(&user)).await?;
            let page = render(&PasswordChangePage {
                layout,
                form: PasswordChangeForm::default(),
                errors,
            })?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn password_done(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Html<String>, ApiError> {
    message_page(
        &state,
        Some(&user),
        "Password changed",
        "Your password has been changed.",
        ("/users/profile/", "Back to profile"),
    )
    .await
}

pub async fn my_cards(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageParam>,
) -> Result<Html<String>, ApiError> {
    let page = state.catalog.cards_by_author(user.id, params.page.as_deref()).await?;
    let layout = layout(&state, "My cards", Some(&user)).await?;
    render(&MyCardsPage {
        layout,
        cards: CardSummary::list(&page),
        pager: Pager::new(&page, "/users/cards/", &[]),
    })
}
