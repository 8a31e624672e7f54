mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{Account, TestApp};

/// An approved car owned by Alice with one booking by Bob; returns (car_id, booking_id)
async fn booked_car(app: &TestApp, admin: &Account, alice: &Account, bob: &Account) -> (String, String) {
    let car_id = app.approved_car(alice, admin, "51A-11111", 50.0).await;
    let (status, booking) = app.book(bob, &car_id, 2).await;
    assert_eq!(status, StatusCode::CREATED);
    (car_id, booking["id"].as_str().unwrap().to_string())
}

async fn complete(app: &TestApp, admin: &Account, booking_id: &str) {
    let uri = format!("/api/bookings/{}/status", booking_id);
    for next in ["confirmed", "completed"] {
        let (status, body) = app
            .put(&uri, Some(&admin.token), json!({ "status": next }))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }
}

#[tokio::test]
async fn feedback_needs_a_completed_booking_of_ones_own() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (_, booking_id) = booked_car(&app, &admin, &alice, &bob).await;

    let review = json!({ "booking_id": booking_id, "content": "Great car", "rating": 5 });

    let (status, body) = app.post("/api/feedbacks", Some(&bob.token), review.clone()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Feedback can only be left for completed bookings");

    complete(&app, &admin, &booking_id).await;

    let (status, _) = app.post("/api/feedbacks", Some(&alice.token), review.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            "/api/feedbacks",
            Some(&bob.token),
            json!({ "booking_id": booking_id, "content": "Great car", "rating": 6 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Rating must be between 1 and 5");

    let (status, body) = app.post("/api/feedbacks", Some(&bob.token), review.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["rating"], 5);
    assert_eq!(body["booking"]["car"]["license_plate"], "51A-11111");
    assert_eq!(body["booking"]["user"]["name"], "Bob");

    let (status, body) = app.post("/api/feedbacks", Some(&bob.token), review).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Feedback already exists for this booking");
}

#[tokio::test]
async fn feedback_reads_and_car_aggregation() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (car_id, booking_id) = booked_car(&app, &admin, &alice, &bob).await;

    let (status, body) = app.get(&format!("/api/cars/feedback/{}", car_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No feedback found for this car");

    complete(&app, &admin, &booking_id).await;
    let (_, created) = app
        .post(
            "/api/feedbacks",
            Some(&bob.token),
            json!({ "booking_id": booking_id, "content": "Clean and fast", "rating": 4 }),
        )
        .await;
    let feedback_id = created["id"].as_str().unwrap().to_string();

    let (status, body) = app.get(&format!("/api/cars/feedback/{}", car_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["content"], "Clean and fast");
    assert_eq!(entries[0]["rating"], 4);
    assert_eq!(entries[0]["username"], "Bob");
    assert!(entries[0]["date"].is_string());

    let (status, body) = app.get(&format!("/api/feedbacks/car/{}", car_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app.get("/api/feedbacks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app.get(&format!("/api/feedbacks/{}", feedback_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Clean and fast");

    let (status, _) = app
        .get(&format!("/api/feedbacks/{}", uuid::Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feedback_update_and_delete() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let (_, booking_id) = booked_car(&app, &admin, &alice, &bob).await;
    complete(&app, &admin, &booking_id).await;

    let (_, created) = app
        .post(
            "/api/feedbacks",
            Some(&bob.token),
            json!({ "booking_id": booking_id, "content": "Okay", "rating": 3 }),
        )
        .await;
    let uri = format!("/api/feedbacks/{}", created["id"].as_str().unwrap());

    let (status, _) = app
        .put(&uri, Some(&alice.token), json!({ "rating": 1 }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.put(&uri, Some(&bob.token), json!({ "rating": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(&uri, Some(&bob.token), json!({ "content": "Better than expected", "rating": 4 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "Better than expected");
    assert_eq!(body["rating"], 4);

    let (status, _) = app.delete(&uri, Some(&bob.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
