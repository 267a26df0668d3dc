//! Creating, editing and deleting cards through the router.

mod common;

use axum::http::StatusCode;
use common::http::TestApp;
use domains::{CardRepository, UserRole};

#[tokio::test]
async fn adding_a_card_requires_login() {
    let app = TestApp::new();
    let response = app.get("/cards/add/", None).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/users/login/?next=%2Fcards%2Fadd%2F");
}

#[tokio::test]
async fn created_card_is_stored_tagged_and_announced() {
    let app = TestApp::new();
    let rust = common::category(&app.store, "Rust").await;
    let alice = common::user(&app.store, "alice", UserRole::User).await;
    let cookie = app.cookie_for(&alice);

    let body = format!(
        "question=What+is+Send%3F&answer=Safe+to+move&category={}&tags=Threads%2C+traits",
        rust.id
    );
    let response = app.post_form("/cards/add/", &body, Some(&cookie)).await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let id: i64 = response
        .location()
        .trim_start_matches("/cards/")
        .trim_end_matches("/detail/")
        .parse()
        .unwrap();
    let detail = app.store.find_detail(id).await.unwrap().unwrap();
    assert_eq!(detail.card.question, "What is Send?");
    assert_eq!(detail.card.author_id, Some(alice.id));
    assert_eq!(detail.tag_names(), vec!["threads", "traits"]);

    let events = app.notifier.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].card_id, id);
    assert_eq!(events[0].author.as_deref(), Some("alice"));
}

#[tokio::test]
async fn invalid_card_form_is_shown_again() {
    let app = TestApp::new();
    common::category(&app.store, "Rust").await;
    let alice = common::user(&app.store, "alice", UserRole::User).await;
    let cookie = app.cookie_for(&alice);

    let response = app
        .post_form("/cards/add/", "question=&answer=x&category=999&tags=", Some(&cookie))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body.contains("class=\"error\""));
    assert_eq!(app.store.count().await.unwrap(), 0);
    assert!(app.notifier.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn only_the_author_or_a_moderator_may_edit() {
    let app = TestApp::new();
    let rust = common::category(&app.store, "Rust").await;
    let alice = common::user(&app.store, "alice", UserRole::User).await;
    let bob = common::user(&app.store, "bob", UserRole::User).await;
    let moderator = common::user(&app.store, "mod", UserRole::Moderator).await;
    let card = common::card(&app.store, &rust, Some(&alice), "Q", "A", "x").await;
    let url = format!("/cards/{}/edit/", card.card.id);

    assert_eq!(app.get(&url, Some(&app.cookie_for(&bob))).await.status, StatusCode::FORBIDDEN);
    assert_eq!(app.get(&url, Some(&app.cookie_for(&alice))).await.status, StatusCode::OK);
    assert_eq!(app.get(&url, Some(&app.cookie_for(&moderator))).await.status, StatusCode::OK);

    let body = format!("question=New+Q&answer=New+A&category={}&tags=y", rust.id);
    let response = app.post_form(&url, &body, Some(&app.cookie_for(&alice))).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);

    let detail = app.store.find_detail(card.card.id).await.unwrap().unwrap();
    assert_eq!(detail.card.question, "New Q");
    assert_eq!(detail.tag_names(), vec!["y"]);
}

#[tokio::test]
async fn author_sees_manage_links_and_can_delete() {
    let app = TestApp::new();
    let rust = common::category(&app.store, "Rust").await;
    let alice = common::user(&app.store, "alice", UserRole::User).await;
    let cookie = app.cookie_for(&alice);
    let card = common::card(&app.store, &rust, Some(&alice), "Q", "A", "").await;

    let detail = app.get(&format!("/cards/{}/detail/", card.card.id), Some(&cookie)).await;
    assert!(detail.body.contains(&format!("/cards/{}/edit/", card.card.id)));

    let url = format!("/cards/{}/delete/", card.card.id);
    assert_eq!(app.get(&url, Some(&cookie)).await.status, StatusCode::OK);
    let response = app.post_form(&url, "", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/cards/catalog/");
    assert!(CardRepository::find(&app.store, card.card.id).await.unwrap().is_none());
}

#[tokio::test]
async fn my_cards_lists_only_own_cards() {
    let app = TestApp::new();
    let rust = common::category(&app.store, "Rust").await;
    let alice = common::user(&app.store, "alice", UserRole::User).await;
    let bob = common::user(&app.store, "bob", UserRole::User).await;
    common::card(&app.store, &rust, Some(&alice), "Alice question", "A", "").await;
    common::card(&app.store, &rust, Some(&bob), "Bob question", "A", "").await;

    let response = app.get("/users/cards/", Some(&app.cookie_for(&alice))).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Alice question"));
    assert!(!response.body.contains("Bob question"));
}
