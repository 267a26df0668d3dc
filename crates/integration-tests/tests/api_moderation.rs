//! Moderation back-office through the router.

mod common;

use axum::http::StatusCode;
use common::http::TestApp;
use domains::{CardRepository, CardStatus, CategoryRepository, UserRole};

#[tokio::test]
async fn back_office_is_for_moderators_only() {
    let app = TestApp::new();
    let user = common::user(&app.store, "alice", UserRole::User).await;
    let moderator = common::user(&app.store, "mod", UserRole::Moderator).await;

    assert_eq!(app.get("/admin/cards/", None).await.status, StatusCode::SEE_OTHER);
    assert_eq!(
        app.get("/admin/cards/", Some(&app.cookie_for(&user))).await.status,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        app.get("/admin/cards/", Some(&app.cookie_for(&moderator))).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn bulk_action_marks_selected_cards() {
    let app = TestApp::new();
    let rust = common::category(&app.store, "Rust").await;
    let moderator = common::user(&app.store, "mod", UserRole::Admin).await;
    let a = common::card(&app.store, &rust, None, "Q1", "A", "").await;
    let b = common::card(&app.store, &rust, None, "Q2", "A", "").await;
    let c = common::card(&app.store, &rust, None, "Q3", "A", "").await;

    let body = format!("action=set_checked&ids={}&ids={}", a.card.id, b.card.id);
    let response = app
        .post_form("/admin/cards/action/", &body, Some(&app.cookie_for(&moderator)))
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert!(response.location().contains("2+cards+marked+as+checked"));
    for (card, expected) in [(&a, CardStatus::Checked), (&b, CardStatus::Checked), (&c, CardStatus::Unchecked)] {
        let stored = CardRepository::find(&app.store, card.card.id).await.unwrap().unwrap();
        assert_eq!(stored.status, expected);
    }
}

#[tokio::test]
async fn review_list_filters_by_status() {
    let app = TestApp::new();
    let rust = common::category(&app.store, "Rust").await;
    let moderator = common::user(&app.store, "mod", UserRole::Moderator).await;
    let checked = common::card(&app.store, &rust, None, "Checked one", "A", "").await;
    common::card(&app.store, &rust, None, "Pending one", "A", "").await;
    app.store
        .set_status(&[checked.card.id], CardStatus::Checked)
        .await
        .unwrap();

    let response = app
        .get("/admin/cards/?status=unchecked", Some(&app.cookie_for(&moderator)))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Pending one"));
    assert!(!response.body.contains("Checked one"));
}

#[tokio::test]
async fn moderator_edit_sets_status() {
    let app = TestApp::new();
    let rust = common::category(&app.store, "Rust").await;
    let moderator = common::user(&app.store, "mod", UserRole::Moderator).await;
    let card = common::card(&app.store, &rust, None, "Q", "A", "keep").await;
    let url = format!("/admin/cards/{}/", card.card.id);
    let cookie = app.cookie_for(&moderator);

    assert_eq!(app.get(&url, Some(&cookie)).await.status, StatusCode::OK);
    let body = format!("question=Fixed&answer=Better&category={}&status=on", rust.id);
    let response = app.post_form(&url, &body, Some(&cookie)).await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let detail = app.store.find_detail(card.card.id).await.unwrap().unwrap();
    assert_eq!(detail.card.question, "Fixed");
    assert_eq!(detail.card.status, CardStatus::Checked);
    assert_eq!(detail.tag_names(), vec!["keep"]);
}

#[tokio::test]
async fn categories_can_be_created_and_deleted() {
    let app = TestApp::new();
    let moderator = common::user(&app.store, "mod", UserRole::Moderator).await;
    let cookie = app.cookie_for(&moderator);

    let created = app.post_form("/admin/categories/", "name=Databases", Some(&cookie)).await;
    assert_eq!(created.status, StatusCode::SEE_OTHER);
    let categories = CategoryRepository::list(&app.store).await.unwrap();
    assert_eq!(categories.len(), 1);
    let databases = categories[0].clone();
    common::card(&app.store, &databases, None, "Q", "A", "").await;

    let empty = app.post_form("/admin/categories/", "name=", Some(&cookie)).await;
    assert_eq!(empty.status, StatusCode::UNPROCESSABLE_ENTITY);

    let deleted = app
        .post_form(&format!("/admin/categories/{}/delete/", databases.id), "", Some(&cookie))
        .await;
    assert_eq!(deleted.status, StatusCode::SEE_OTHER);
    assert!(CategoryRepository::list(&app.store).await.unwrap().is_empty());
    assert_eq!(app.store.count().await.unwrap(), 0);
}
