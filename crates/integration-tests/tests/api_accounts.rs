//! Registration, login, logout and profile pages.

mod common;

use axum::http::StatusCode;
use common::http::{TestApp, COOKIE_NAME};
use domains::{UserRepository, UserRole};

#[tokio::test]
async fn registration_creates_an_account() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/users/register/",
            "username=carol&email=carol%40example.com&first_name=&last_name=&password1=long-enough&password2=long-enough",
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/users/thanks/");
    let carol = app.store.find_by_username("carol").await.unwrap().unwrap();
    assert_eq!(carol.role, UserRole::User);
    assert_ne!(carol.password_hash, "long-enough");
}

#[tokio::test]
async fn mismatched_passwords_rerender_the_form() {
    let app = TestApp::new();

    let response = app
        .post_form(
            "/users/register/",
            "username=carol&email=&first_name=&last_name=&password1=long-enough&password2=different",
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!response.body.contains("long-enough"));
    assert!(app.store.find_by_username("carol").await.unwrap().is_none());
}

#[tokio::test]
async fn login_sets_a_session_and_follows_next() {
    let app = TestApp::new();
    common::user_with_password(&app.store, "dave").await;

    let body = format!("username=dave&password={}&next=%2Fcards%2Fadd%2F", common::PASSWORD);
    let response = app.post_form("/users/login/", &body, None).await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/cards/add/");
    let cookie = response.set_cookie().unwrap();
    assert!(cookie.starts_with(&format!("{COOKIE_NAME}=")));
    assert!(cookie.contains("HttpOnly"));

    let session = cookie.split(';').next().unwrap();
    let profile = app.get("/users/profile/", Some(session)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert!(profile.body.contains("dave"));
}

#[tokio::test]
async fn wrong_password_and_offsite_next_are_refused() {
    let app = TestApp::new();
    common::user_with_password(&app.store, "dave").await;

    let wrong = app
        .post_form("/users/login/", "username=dave&password=nope", None)
        .await;
    assert_eq!(wrong.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(wrong.body.contains("Please enter a correct username and password."));
    assert!(wrong.set_cookie().is_none());

    let body = format!("username=dave&password={}&next=%2F%2Fevil.example", common::PASSWORD);
    let offsite = app.post_form("/users/login/", &body, None).await;
    assert_eq!(offsite.location(), "/");
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = TestApp::new();
    let response = app.post_form("/users/logout/", "", None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response.set_cookie().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn forged_session_counts_as_anonymous() {
    let app = TestApp::new();
    let cookie = format!("{COOKIE_NAME}=not-a-token");
    let response = app.get("/users/profile/", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn profile_update_is_saved() {
    let app = TestApp::new();
    let erin = common::user(&app.store, "erin", UserRole::User).await;
    let cookie = app.cookie_for(&erin);

    let response = app
        .post_form(
            "/users/profile/",
            "email=erin%40example.com&first_name=Erin&last_name=Smith",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let stored = UserRepository::find(&app.store, erin.id).await.unwrap().unwrap();
    assert_eq!(stored.first_name, "Erin");
    assert_eq!(stored.email.as_deref(), Some("erin@example.com"));
}
