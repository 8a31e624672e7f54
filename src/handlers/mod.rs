pub mod bookings;
pub mod cars;
pub mod feedbacks;
pub mod transactions;
pub mod users;

use axum::extract::{FromRequest, FromRequestParts};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

/// JSON body extractor whose rejections render as `400 {message}`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path extractor; a malformed id is a JSON 400 instead of plain text
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Public identity of a related user
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_no: Option<String>,
}

impl From<&crate::entities::user::Model> for UserSummary {
    fn from(u: &crate::entities::user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            phone_no: u.phone_no.clone(),
        }
    }
}

/// Identifying fields of a related car
#[derive(Debug, Clone, Serialize)]
pub struct CarSummary {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub name: String,
    pub license_plate: String,
}

impl From<&crate::entities::car::Model> for CarSummary {
    fn from(c: &crate::entities::car::Model) -> Self {
        Self {
            id: c.id,
            brand: c.brand.clone(),
            model: c.model.clone(),
            name: c.name.clone(),
            license_plate: c.license_plate.clone(),
        }
    }
}
