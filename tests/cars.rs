mod common;

use axum::http::StatusCode;
use sea_orm::{sea_query::Expr, ColumnTrait, EntityTrait, QueryFilter};
use serde_json::json;

use car_rental_backend::entities::{permission, permission_role, role, user};
use common::{car_payload, TestApp};

async fn member_role(app: &TestApp) -> role::Model {
    role::Entity::find()
        .filter(role::Column::Name.eq(role::USER))
        .one(&app.db)
        .await
        .unwrap()
        .expect("user role seeded")
}

async fn create_car_permission(app: &TestApp) -> permission::Model {
    permission::Entity::find()
        .filter(permission::Column::Name.eq("create_car"))
        .one(&app.db)
        .await
        .unwrap()
        .expect("create_car seeded")
}

#[tokio::test]
async fn new_car_starts_available_and_unapproved() {
    let app = TestApp::new().await;
    let alice = app.register("Alice", "alice@example.com").await;

    let car = app.create_car(&alice, "51A-11111", 50.0).await;

    assert_eq!(car["car_status"], "available");
    assert_eq!(car["car_approved"], "no");
    assert_eq!(car["owner"]["id"], alice.id.to_string());
    assert_eq!(car["owner"]["name"], "Alice");
    assert_eq!(car["image_url"], json!(["https://cdn.example.com/cars/front.jpg"]));
    assert_eq!(
        car["document_url"],
        json!(["https://cdn.example.com/docs/registration.pdf"])
    );
}

#[tokio::test]
async fn car_creation_is_validated() {
    let app = TestApp::new().await;
    let alice = app.register("Alice", "alice@example.com").await;

    let (status, _) = app.post("/api/cars", None, car_payload("51A-11111", 50.0)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post("/api/cars", Some(&alice.token), car_payload("51A-11111", 0.0))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Base price must be greater than 0");

    let mut missing_brand = car_payload("51A-11111", 50.0);
    missing_brand.as_object_mut().unwrap().remove("brand");
    let (status, _) = app.post("/api/cars", Some(&alice.token), missing_brand).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.create_car(&alice, "51A-11111", 50.0).await;
    let (status, _) = app
        .post("/api/cars", Some(&alice.token), car_payload("51A-11111", 60.0))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_listing_shows_only_approved_cars() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;

    app.create_car(&alice, "51A-11111", 50.0).await;
    let approved = app.approved_car(&alice, &admin, "51A-22222", 70.0).await;

    let (status, body) = app.get("/api/cars", None).await;
    assert_eq!(status, StatusCode::OK);
    let cars = body.as_array().unwrap();
    assert_eq!(cars.len(), 1);
    assert_eq!(cars[0]["id"], approved);

    let (status, body) = app.get("/api/cars/admin", Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = app.get("/api/cars/admin", Some(&alice.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unapproved_car_is_hidden_from_strangers() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;

    let car = app.create_car(&alice, "51A-11111", 50.0).await;
    let uri = format!("/api/cars/{}", car["id"].as_str().unwrap());

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri, Some(&bob.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&uri, Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&uri, Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn owner_listing_depends_on_viewer() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;

    app.create_car(&alice, "51A-11111", 50.0).await;
    app.approved_car(&alice, &admin, "51A-22222", 70.0).await;

    let uri = format!("/api/cars/owner/{}", alice.id);
    let (_, own) = app.get(&uri, Some(&alice.token)).await;
    assert_eq!(own.as_array().unwrap().len(), 2);
    let (_, as_admin) = app.get(&uri, Some(&admin.token)).await;
    assert_eq!(as_admin.as_array().unwrap().len(), 2);
    let (_, as_bob) = app.get(&uri, Some(&bob.token)).await;
    assert_eq!(as_bob.as_array().unwrap().len(), 1);
    let (_, anonymous) = app.get(&uri, None).await;
    assert_eq!(anonymous.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn owner_update_always_withdraws_approval() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let car_id = app.approved_car(&alice, &admin, "51A-11111", 50.0).await;
    let uri = format!("/api/cars/{}", car_id);

    let (status, body) = app
        .put(&uri, Some(&bob.token), json!({ "color": "black" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized to update this car");

    let (status, body) = app
        .put(
            &uri,
            Some(&alice.token),
            json!({ "color": "black", "base_price": 65.0, "car_approved": "yes" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["color"], "black");
    assert_eq!(body["base_price"], 65.0);
    assert_eq!(body["car_approved"], "no");

    let (status, _) = app
        .put(&uri, Some(&alice.token), json!({ "number_of_seats": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn car_status_is_locked_while_booked() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let car_id = app.approved_car(&alice, &admin, "51A-11111", 50.0).await;
    let uri = format!("/api/cars/{}", car_id);

    let (status, body) = app
        .put(&uri, Some(&alice.token), json!({ "car_status": "maintenance" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["car_status"], "maintenance");

    app.put(&uri, Some(&alice.token), json!({ "car_status": "available" }))
        .await;
    app.put(
        &format!("{}/approve", uri),
        Some(&admin.token),
        json!({ "car_approved": "yes" }),
    )
    .await;
    let (status, _) = app.book(&bob, &car_id, 2).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .put(&uri, Some(&alice.token), json!({ "car_status": "available" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn approval_accepts_only_yes_or_no() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let car = app.create_car(&alice, "51A-11111", 50.0).await;
    let uri = format!("/api/cars/{}/approve", car["id"].as_str().unwrap());

    let (status, _) = app
        .put(&uri, Some(&admin.token), json!({ "car_approved": "maybe" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .put(&uri, Some(&alice.token), json!({ "car_approved": "yes" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&uri, Some(&admin.token), json!({ "car_approved": "yes" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["car_approved"], "yes");
}

#[tokio::test]
async fn adding_media_records_urls_and_withdraws_approval() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let car_id = app.approved_car(&alice, &admin, "51A-11111", 50.0).await;

    let (status, _) = app
        .post(
            &format!("/api/cars/{}/images", car_id),
            Some(&bob.token),
            json!({ "urls": ["https://cdn.example.com/cars/side.jpg"] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post(
            &format!("/api/cars/{}/images", car_id),
            Some(&alice.token),
            json!({ "urls": ["https://cdn.example.com/cars/side.jpg"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["image_url"].as_array().unwrap().len(), 2);
    assert_eq!(body["car_approved"], "no");

    let (status, body) = app
        .post(
            &format!("/api/cars/{}/documents", car_id),
            Some(&admin.token),
            json!({ "documents": [{
                "document_name": "insurance.pdf",
                "file_path": "https://cdn.example.com/docs/insurance.pdf",
                "file_type": "pdf"
            }] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_url"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admin_deletes_car() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let car = app.create_car(&alice, "51A-11111", 50.0).await;
    let uri = format!("/api/cars/{}", car["id"].as_str().unwrap());

    let (status, _) = app.delete(&uri, Some(&alice.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&uri, Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, Some(&admin.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // plate is free again
    app.create_car(&alice, "51A-11111", 50.0).await;
}

#[tokio::test]
async fn owner_status_update_needs_an_active_booking() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let bob = app.register("Bob", "bob@example.com").await;
    let car_id = app.approved_car(&alice, &admin, "51A-11111", 50.0).await;
    let uri = format!("/api/cars/{}/status", car_id);

    let (status, body) = app
        .put(&uri, Some(&alice.token), json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No active booking found for this car");

    app.book(&bob, &car_id, 2).await;

    let (status, _) = app
        .put(&uri, Some(&bob.token), json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put(&uri, Some(&alice.token), json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking_status"], "confirmed");

    let (status, body) = app
        .put(&uri, Some(&alice.token), json!({ "status": "completed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking_status"], "completed");
    assert_eq!(app.car_status(&car_id, &alice).await, "available");
}

#[tokio::test]
async fn car_feedback_requires_bookings_and_feedback() {
    let app = TestApp::new().await;
    let admin = app.admin("admin@example.com").await;
    let alice = app.register("Alice", "alice@example.com").await;
    let car_id = app.approved_car(&alice, &admin, "51A-11111", 50.0).await;

    let (status, body) = app.get(&format!("/api/cars/feedback/{}", car_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No bookings found for this car");
}

#[tokio::test]
async fn listing_needs_the_create_car_grant() {
    let app = TestApp::new().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let member = member_role(&app).await;
    let create_car = create_car_permission(&app).await;

    permission_role::Entity::delete_many()
        .filter(permission_role::Column::RoleId.eq(member.id))
        .filter(permission_role::Column::PermissionId.eq(create_car.id))
        .exec(&app.db)
        .await
        .unwrap();

    let (status, body) = app
        .post("/api/cars", Some(&alice.token), car_payload("51A-11111", 50.0))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized for this action");

    // other grants of the role are untouched
    let (status, _) = app.get("/api/bookings/mybookings", Some(&alice.token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_permission_denies_the_route() {
    let app = TestApp::new().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let create_car = create_car_permission(&app).await;

    permission_role::Entity::delete_many()
        .filter(permission_role::Column::PermissionId.eq(create_car.id))
        .exec(&app.db)
        .await
        .unwrap();
    permission::Entity::delete_by_id(create_car.id)
        .exec(&app.db)
        .await
        .unwrap();

    let (status, body) = app
        .post("/api/cars", Some(&alice.token), car_payload("51A-11111", 50.0))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Permission not found");
}

#[tokio::test]
async fn roleless_user_cannot_list_a_car() {
    let app = TestApp::new().await;
    let alice = app.register("Alice", "alice@example.com").await;

    user::Entity::update_many()
        .col_expr(user::Column::RoleId, Expr::value(Option::<uuid::Uuid>::None))
        .filter(user::Column::Id.eq(alice.id))
        .exec(&app.db)
        .await
        .unwrap();

    let (status, body) = app
        .post("/api/cars", Some(&alice.token), car_payload("51A-11111", 50.0))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized");
}

#[tokio::test]
async fn inactive_role_grants_nothing() {
    let app = TestApp::new().await;
    let alice = app.register("Alice", "alice@example.com").await;
    let member = member_role(&app).await;

    role::Entity::update_many()
        .col_expr(role::Column::Active, Expr::value(false))
        .filter(role::Column::Id.eq(member.id))
        .exec(&app.db)
        .await
        .unwrap();

    let (status, body) = app
        .post("/api/cars", Some(&alice.token), car_payload("51A-11111", 50.0))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized");
}
