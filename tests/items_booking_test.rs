//! Integration tests for wishlist items and the booking lifecycle.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{response_json, FlakyRepository, TestApp};
use serde_json::{json, Value};
use wishlist_api::models::{ItemId, UserId};

fn item(title: &str) -> Value {
    json!({ "title": title, "link": "https://shop.example.com/item" })
}

async fn book(app: &TestApp, user: &str, wishlist_id: &str, item_id: &str) -> StatusCode {
    app.request_as(
        user,
        Method::POST,
        &format!("/api/v1/wishlists/{wishlist_id}/items/{item_id}/book"),
        None,
    )
    .await
    .status()
}

async fn unbook(app: &TestApp, user: &str, wishlist_id: &str, item_id: &str) -> StatusCode {
    app.request_as(
        user,
        Method::POST,
        &format!("/api/v1/wishlists/{wishlist_id}/items/{item_id}/unbook"),
        None,
    )
    .await
    .status()
}

async fn item_view(app: &TestApp, viewer: &str, wishlist_id: &str, item_id: &str) -> Value {
    let response = app
        .request_as(
            viewer,
            Method::GET,
            &format!("/api/v1/wishlists/{wishlist_id}/items?limit=5"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    body["data"]["items"]
        .as_array()
        .expect("items array")
        .iter()
        .find(|entry| entry["id"] == item_id)
        .cloned()
        .expect("item present in listing")
}

#[tokio::test]
async fn owner_adds_items_and_guests_cannot() {
    let app = TestApp::new().await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;

    let created = app
        .request_as(
            "alice",
            Method::POST,
            &format!("/api/v1/wishlists/{wishlist_id}/items"),
            Some(json!({ "item": { "title": "Kettle" } })),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = response_json(created).await;
    assert_eq!(body["data"]["wishlistId"], wishlist_id.as_str());
    assert_eq!(body["data"]["isBookingAvailable"], true);
    assert_eq!(body["data"]["isBooked"], false);

    let foreign = app
        .request_as(
            "bob",
            Method::POST,
            &format!("/api/v1/wishlists/{wishlist_id}/items"),
            Some(json!({ "item": { "title": "Sneaky" } })),
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_link_is_rejected() {
    let app = TestApp::new().await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;

    let response = app
        .request_as(
            "alice",
            Method::POST,
            &format!("/api/v1/wishlists/{wishlist_id}/items"),
            Some(json!({ "item": { "title": "Kettle", "link": "not a url" } })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_pages_with_has_more() {
    let app = TestApp::new().await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;
    for n in 0..3 {
        app.add_item("alice", &wishlist_id, item(&format!("Gift {n}")))
            .await;
    }

    // Default page size in tests is 2
    let first = app
        .request_as(
            "bob",
            Method::GET,
            &format!("/api/v1/wishlists/{wishlist_id}/items"),
            None,
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);
    let first = response_json(first).await;
    assert_eq!(first["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(first["data"]["hasMore"], true);
    assert_eq!(first["data"]["limit"], 2);

    let second = app
        .request_as(
            "bob",
            Method::GET,
            &format!("/api/v1/wishlists/{wishlist_id}/items?limit=2&offset=2"),
            None,
        )
        .await;
    let second = response_json(second).await;
    assert_eq!(second["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["data"]["hasMore"], false);

    let exact = app
        .request_as(
            "bob",
            Method::GET,
            &format!("/api/v1/wishlists/{wishlist_id}/items?limit=3"),
            None,
        )
        .await;
    let exact = response_json(exact).await;
    assert_eq!(exact["data"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(exact["data"]["hasMore"], false);
}

#[tokio::test]
async fn oversized_limit_is_clamped_and_garbage_query_is_bad_data() {
    let app = TestApp::new().await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;

    let clamped = app
        .request_as(
            "alice",
            Method::GET,
            &format!("/api/v1/wishlists/{wishlist_id}/items?limit=500"),
            None,
        )
        .await;
    assert_eq!(response_json(clamped).await["data"]["limit"], 5);

    let garbage = app
        .request_as(
            "alice",
            Method::GET,
            &format!("/api/v1/wishlists/{wishlist_id}/items?limit=lots"),
            None,
        )
        .await;
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_lifecycle_between_guests() {
    let app = TestApp::new().await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;
    let item_id = app.add_item("alice", &wishlist_id, item("Kettle")).await;

    assert_eq!(book(&app, "bob", &wishlist_id, &item_id).await, StatusCode::NO_CONTENT);
    // Re-booking by the same guest is a no-op
    assert_eq!(book(&app, "bob", &wishlist_id, &item_id).await, StatusCode::NO_CONTENT);

    let conflict = app
        .request_as(
            "carol",
            Method::POST,
            &format!("/api/v1/wishlists/{wishlist_id}/items/{item_id}/book"),
            None,
        )
        .await;
    assert_eq!(conflict.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(conflict).await["key"], "already_booked");

    let bob_view = item_view(&app, "bob", &wishlist_id, &item_id).await;
    assert_eq!(bob_view["isBooked"], true);
    assert_eq!(bob_view["isBookedByMe"], true);
    let owner_view = item_view(&app, "alice", &wishlist_id, &item_id).await;
    assert_eq!(owner_view["isBooked"], true);
    assert_eq!(owner_view["isBookedByMe"], false);
    assert!(owner_view.get("isBookedBy").is_none(), "booker must stay hidden");

    // Carol cannot clear Bob's booking
    assert_eq!(unbook(&app, "carol", &wishlist_id, &item_id).await, StatusCode::FORBIDDEN);

    assert_eq!(unbook(&app, "bob", &wishlist_id, &item_id).await, StatusCode::NO_CONTENT);
    // Unbooking an unbooked item is a no-op for anyone
    assert_eq!(unbook(&app, "carol", &wishlist_id, &item_id).await, StatusCode::NO_CONTENT);

    assert_eq!(book(&app, "carol", &wishlist_id, &item_id).await, StatusCode::NO_CONTENT);
    let carol_view = item_view(&app, "carol", &wishlist_id, &item_id).await;
    assert_eq!(carol_view["isBookedByMe"], true);
}

#[tokio::test]
async fn owner_cannot_book_but_can_release() {
    let app = TestApp::new().await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;
    let item_id = app.add_item("alice", &wishlist_id, item("Kettle")).await;

    let own = app
        .request_as(
            "alice",
            Method::POST,
            &format!("/api/v1/wishlists/{wishlist_id}/items/{item_id}/book"),
            None,
        )
        .await;
    assert_eq!(own.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response_json(own).await["message"],
        "you can't book items of your own wishlist"
    );

    assert_eq!(book(&app, "bob", &wishlist_id, &item_id).await, StatusCode::NO_CONTENT);
    assert_eq!(unbook(&app, "alice", &wishlist_id, &item_id).await, StatusCode::NO_CONTENT);
    let view = item_view(&app, "bob", &wishlist_id, &item_id).await;
    assert_eq!(view["isBooked"], false);
}

#[tokio::test]
async fn booking_that_lands_mid_request_cannot_be_cleared_by_a_stranger() {
    let repository = Arc::new(FlakyRepository::new());
    let app = TestApp::with_repository(repository.clone()).await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;
    let item_id = app.add_item("alice", &wishlist_id, item("Kettle")).await;

    // Carol's request reads the item while it is free; Bob books it before
    // her write runs.
    *repository.book_after_item_read.lock().unwrap() = Some(UserId::new("bob"));
    let response = app
        .request_as(
            "carol",
            Method::POST,
            &format!("/api/v1/wishlists/{wishlist_id}/items/{item_id}/unbook"),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        response_json(response).await["message"],
        "item is booked by another user"
    );
    let stored = app
        .state
        .wishlist_service()
        .get_wishlist_item(&ItemId::new(item_id))
        .await
        .unwrap();
    assert!(stored.is_booked_by_user(&UserId::new("bob")));
}

#[tokio::test]
async fn unavailable_item_cannot_be_booked() {
    let app = TestApp::new().await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;
    let item_id = app
        .add_item(
            "alice",
            &wishlist_id,
            json!({ "title": "Surprise", "isBookingAvailable": false }),
        )
        .await;

    let response = app
        .request_as(
            "bob",
            Method::POST,
            &format!("/api/v1/wishlists/{wishlist_id}/items/{item_id}/book"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response_json(response).await["key"], "booking_not_available");
}

#[tokio::test]
async fn concurrent_bookings_have_a_single_winner() {
    let app = std::sync::Arc::new(TestApp::new().await);
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;
    let item_id = app.add_item("alice", &wishlist_id, item("Kettle")).await;

    let mut handles = Vec::new();
    for n in 0..8 {
        let app = app.clone();
        let (wishlist_id, item_id) = (wishlist_id.clone(), item_id.clone());
        handles.push(tokio::spawn(async move {
            book(&app, &format!("guest-{n}"), &wishlist_id, &item_id).await
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.expect("booking task"));
    }

    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::NO_CONTENT).count(),
        1
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(),
        7
    );
}

#[tokio::test]
async fn items_are_scoped_to_their_wishlist() {
    let app = TestApp::new().await;
    let birthday = app.create_wishlist("alice", "Birthday").await;
    let wedding = app.create_wishlist("alice", "Wedding").await;
    let item_id = app.add_item("alice", &birthday, item("Kettle")).await;

    // Addressing the item through the wrong wishlist looks like a bad path
    let response = app
        .request_as(
            "bob",
            Method::POST,
            &format!("/api/v1/wishlists/{wedding}/items/{item_id}/book"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response_json(response).await["message"], "incorrect path parameter");
}

#[tokio::test]
async fn removing_items() {
    let app = TestApp::new().await;
    let wishlist_id = app.create_wishlist("alice", "Birthday").await;
    let item_id = app.add_item("alice", &wishlist_id, item("Kettle")).await;
    let uri = format!("/api/v1/wishlists/{wishlist_id}/items/{item_id}");

    let foreign = app.request_as("bob", Method::DELETE, &uri, None).await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    let removed = app.request_as("alice", Method::DELETE, &uri, None).await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);

    let again = app.request_as("alice", Method::DELETE, &uri, None).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}
