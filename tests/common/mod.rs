//! Shared harness for the API tests.
//!
//! Every [`TestApp`] owns a fresh in-memory SQLite database with the full
//! schema migrated and the default roles and permissions seeded.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use sea_orm::{
    sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use car_rental_backend::{
    config::Config,
    db::{self, seed::seed_access_control},
    entities::{role, user},
    routes::create_router,
    AppState,
};

pub const PASSWORD: &str = "password123";

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-access-secret".to_string(),
        jwt_expiration_hours: 1,
        refresh_token_secret: "test-refresh-secret".to_string(),
        refresh_token_expiration_days: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        app_env: "test".to_string(),
        admin_email: None,
        admin_password: None,
        rate_limit_per_minute: 1000,
        rate_limit_burst: 1000,
    }
}

/// A registered account as seen by the tests
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub token: String,
    pub refresh_token: String,
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = test_config();
        let db = db::connect(&config).await.expect("connect sqlite");
        migration::Migrator::up(&db, None).await.expect("run migrations");
        seed_access_control(&db).await.expect("seed access control");

        let state = AppState {
            db: db.clone(),
            config,
        };

        Self {
            db,
            router: create_router(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub async fn register(&self, name: &str, email: &str) -> Account {
        let (status, body) = self
            .post(
                "/api/users",
                None,
                json!({ "name": name, "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        account(&body)
    }

    /// Register an account and give it the admin role
    pub async fn admin(&self, email: &str) -> Account {
        let account = self.register("Admin", email).await;
        let admin_role = role::Entity::find()
            .filter(role::Column::Name.eq(role::ADMIN))
            .one(&self.db)
            .await
            .expect("query role")
            .expect("admin role seeded");

        user::Entity::update_many()
            .col_expr(user::Column::RoleId, Expr::value(admin_role.id))
            .filter(user::Column::Id.eq(account.id))
            .exec(&self.db)
            .await
            .expect("promote to admin");
        account
    }

    pub async fn create_car(&self, owner: &Account, plate: &str, base_price: f64) -> Value {
        let (status, body) = self
            .post("/api/cars", Some(&owner.token), car_payload(plate, base_price))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create car failed: {}", body);
        body
    }

    /// Create a car and have an admin approve it
    pub async fn approved_car(&self, owner: &Account, admin: &Account, plate: &str, base_price: f64) -> String {
        let car = self.create_car(owner, plate, base_price).await;
        let car_id = car["id"].as_str().expect("car id").to_string();
        let (status, body) = self
            .put(
                &format!("/api/cars/{}/approve", car_id),
                Some(&admin.token),
                json!({ "car_approved": "yes" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "approve failed: {}", body);
        car_id
    }

    pub async fn book(&self, renter: &Account, car_id: &str, days: i64) -> (StatusCode, Value) {
        self.post("/api/bookings", Some(&renter.token), booking_payload(car_id, days))
            .await
    }

    pub async fn car_status(&self, car_id: &str, viewer: &Account) -> String {
        let (status, body) = self.get(&format!("/api/cars/{}", car_id), Some(&viewer.token)).await;
        assert_eq!(status, StatusCode::OK, "get car failed: {}", body);
        body["car_status"].as_str().expect("car_status").to_string()
    }

    pub async fn wallet(&self, account: &Account) -> f64 {
        let (status, body) = self.get("/api/users/profile", Some(&account.token)).await;
        assert_eq!(status, StatusCode::OK, "profile failed: {}", body);
        body["wallet"].as_f64().expect("wallet")
    }
}

fn account(body: &Value) -> Account {
    Account {
        id: body["user"]["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .expect("user id"),
        token: body["token"].as_str().expect("token").to_string(),
        refresh_token: body["refresh_token"]
            .as_str()
            .expect("refresh token")
            .to_string(),
    }
}

pub fn car_payload(plate: &str, base_price: f64) -> Value {
    json!({
        "brand": "Toyota",
        "model": "Vios",
        "name": "Vios 2022",
        "description": "Compact sedan, well kept",
        "base_price": base_price,
        "deposit": 100.0,
        "color": "white",
        "license_plate": plate,
        "production_year": 2022,
        "mileage": 12000.0,
        "fuel_consumption": 6.5,
        "fuel_type": "petrol",
        "transmission_type": "automatic",
        "number_of_seats": 5,
        "address": "12 Nguyen Hue, District 1",
        "terms_of_use": "No smoking, return with a full tank",
        "image_url": ["https://cdn.example.com/cars/front.jpg"],
        "document_url": ["https://cdn.example.com/docs/registration.pdf"]
    })
}

pub fn booking_payload(car_id: &str, days: i64) -> Value {
    let start = chrono::DateTime::parse_from_rfc3339("2025-07-01T09:00:00Z").expect("start");
    let end = start + chrono::Duration::days(days);
    json!({
        "car_id": car_id,
        "start_date_time": start.to_rfc3339(),
        "end_date_time": end.to_rfc3339(),
        "payment_method": "card"
    })
}
