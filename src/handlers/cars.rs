use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::car::{self, Approval, CarStatus};
use crate::entities::{car_document, car_image, feedback, now, user};
use crate::error::{AppError, AppResult};
use crate::handlers::bookings::BookingStatusRequest;
use crate::handlers::{AppJson, AppPath, MessageResponse, UserSummary};
use crate::middleware::auth::{CurrentUser, Viewer};
use crate::policy;
use crate::workflow;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCarRequest {
    pub brand: String,
    pub model: String,
    pub name: String,
    pub description: String,
    pub base_price: f64,
    pub deposit: f64,
    pub color: String,
    pub license_plate: String,
    pub production_year: i32,
    pub mileage: f64,
    pub fuel_consumption: f64,
    pub fuel_type: String,
    pub transmission_type: String,
    pub number_of_seats: i32,
    pub address: String,
    pub terms_of_use: String,
    pub additional_functions: Option<String>,
    #[serde(default)]
    pub image_url: Vec<String>,
    #[serde(default)]
    pub document_url: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCarRequest {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub base_price: Option<f64>,
    pub deposit: Option<f64>,
    pub car_status: Option<CarStatus>,
    pub color: Option<String>,
    pub license_plate: Option<String>,
    pub production_year: Option<i32>,
    pub mileage: Option<f64>,
    pub fuel_consumption: Option<f64>,
    pub fuel_type: Option<String>,
    pub transmission_type: Option<String>,
    pub number_of_seats: Option<i32>,
    pub address: Option<String>,
    pub terms_of_use: Option<String>,
    pub additional_functions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub car_approved: Approval,
}

#[derive(Debug, Deserialize)]
pub struct AddImagesRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentUpload {
    pub document_name: String,
    pub file_path: String,
    pub file_type: String,
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentsRequest {
    pub documents: Vec<DocumentUpload>,
}

#[derive(Debug, Serialize)]
pub struct CarResponse {
    #[serde(flatten)]
    pub car: car::Model,
    pub image_url: Vec<String>,
    pub document_url: Vec<String>,
    pub owner: Option<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct CarFeedbackEntry {
    pub content: String,
    pub rating: i32,
    pub date: chrono::DateTime<chrono::FixedOffset>,
    pub username: String,
}

fn validate_numbers(base_price: Option<f64>, deposit: Option<f64>, seats: Option<i32>) -> AppResult<()> {
    if base_price.is_some_and(|p| p <= 0.0) {
        return Err(AppError::BadRequest("Base price must be greater than 0".to_string()));
    }
    if deposit.is_some_and(|d| d < 0.0) {
        return Err(AppError::BadRequest("Deposit cannot be negative".to_string()));
    }
    if seats.is_some_and(|s| s <= 0) {
        return Err(AppError::BadRequest(
            "Number of seats must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Document name and type guessed from a hosted file URL
fn describe_document(url: &str) -> (String, String) {
    let file_name = url
        .rsplit('/')
        .next()
        .and_then(|segment| segment.split('?').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(url)
        .to_string();
    let file_type = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_else(|| "unknown".to_string());
    (file_name, file_type)
}

async fn find_car<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<car::Model> {
    car::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))
}

async fn insert_images<C: ConnectionTrait>(db: &C, car_id: Uuid, urls: &[String]) -> AppResult<()> {
    for url in urls.iter().filter(|u| !u.trim().is_empty()) {
        car_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            car_id: Set(car_id),
            file_path: Set(url.trim().to_string()),
            created_at: Set(now()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn insert_documents<C: ConnectionTrait>(
    db: &C,
    car_id: Uuid,
    documents: &[DocumentUpload],
) -> AppResult<()> {
    for doc in documents {
        car_document::ActiveModel {
            id: Set(Uuid::new_v4()),
            car_id: Set(car_id),
            document_name: Set(doc.document_name.clone()),
            file_path: Set(doc.file_path.clone()),
            file_type: Set(doc.file_type.clone()),
            created_at: Set(now()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn reset_approval<C: ConnectionTrait>(db: &C, car: car::Model) -> AppResult<car::Model> {
    let mut active: car::ActiveModel = car.into();
    active.car_approved = Set(Approval::No);
    active.updated_at = Set(now());
    Ok(active.update(db).await?)
}

async fn has_active_booking<C: ConnectionTrait>(db: &C, car_id: Uuid) -> AppResult<Option<booking::Model>> {
    Ok(booking::Entity::find()
        .filter(booking::Column::CarId.eq(car_id))
        .filter(booking::Column::BookingStatus.is_in([BookingStatus::Pending, BookingStatus::Confirmed]))
        .order_by_desc(booking::Column::CreatedAt)
        .one(db)
        .await?)
}

/// Attach media locations and owner to each car
async fn with_details<C: ConnectionTrait>(db: &C, cars: Vec<car::Model>) -> AppResult<Vec<CarResponse>> {
    let car_ids: Vec<Uuid> = cars.iter().map(|c| c.id).collect();
    let owner_ids: Vec<Uuid> = cars.iter().map(|c| c.user_id).collect();

    let images = car_image::Entity::find()
        .filter(car_image::Column::CarId.is_in(car_ids.clone()))
        .order_by_asc(car_image::Column::CreatedAt)
        .all(db)
        .await?;
    let documents = car_document::Entity::find()
        .filter(car_document::Column::CarId.is_in(car_ids))
        .order_by_asc(car_document::Column::CreatedAt)
        .all(db)
        .await?;
    let owners = user::Entity::find()
        .filter(user::Column::Id.is_in(owner_ids))
        .all(db)
        .await?;

    Ok(cars
        .into_iter()
        .map(|c| CarResponse {
            image_url: images
                .iter()
                .filter(|i| i.car_id == c.id)
                .map(|i| i.file_path.clone())
                .collect(),
            document_url: documents
                .iter()
                .filter(|d| d.car_id == c.id)
                .map(|d| d.file_path.clone())
                .collect(),
            owner: owners.iter().find(|u| u.id == c.user_id).map(UserSummary::from),
            car: c,
        })
        .collect())
}

async fn with_detail<C: ConnectionTrait>(db: &C, car: car::Model) -> AppResult<CarResponse> {
    with_details(db, vec![car])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Car details missing".to_string()))
}

/// Publicly listed (approved) cars
pub async fn list_approved_cars(State(state): State<AppState>) -> AppResult<Json<Vec<CarResponse>>> {
    let cars = car::Entity::find()
        .filter(car::Column::CarApproved.eq(Approval::Yes))
        .order_by_desc(car::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, cars).await?))
}

/// Every car regardless of approval (admin)
pub async fn list_all_cars(State(state): State<AppState>) -> AppResult<Json<Vec<CarResponse>>> {
    let cars = car::Entity::find()
        .order_by_desc(car::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, cars).await?))
}

/// Unapproved cars are only visible to their owner and admins
pub async fn get_car(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<CarResponse>> {
    let found = find_car(&state.db, id).await?;

    let visible = found.car_approved == Approval::Yes
        || viewer
            .as_ref()
            .is_some_and(|v| policy::owner_or_admin(v, found.user_id, "hidden").is_allowed());
    if !visible {
        return Err(AppError::NotFound("Car not found".to_string()));
    }

    Ok(Json(with_detail(&state.db, found).await?))
}

pub async fn cars_by_owner(
    State(state): State<AppState>,
    Extension(Viewer(viewer)): Extension<Viewer>,
    AppPath(user_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<CarResponse>>> {
    let sees_all = viewer
        .as_ref()
        .is_some_and(|v| policy::owner_or_admin(v, user_id, "hidden").is_allowed());

    let mut query = car::Entity::find().filter(car::Column::UserId.eq(user_id));
    if !sees_all {
        query = query.filter(car::Column::CarApproved.eq(Approval::Yes));
    }
    let cars = query
        .order_by_desc(car::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(with_details(&state.db, cars).await?))
}

/// List a new car; it stays hidden until an admin approves it
pub async fn create_car(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateCarRequest>,
) -> AppResult<(StatusCode, Json<CarResponse>)> {
    validate_numbers(
        Some(payload.base_price),
        Some(payload.deposit),
        Some(payload.number_of_seats),
    )?;

    let license_plate = payload.license_plate.trim().to_string();
    if license_plate.is_empty() {
        return Err(AppError::BadRequest("License plate is required".to_string()));
    }
    let duplicate = car::Entity::find()
        .filter(car::Column::LicensePlate.eq(&license_plate))
        .one(&state.db)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::BadRequest(
            "Car with this license plate already exists".to_string(),
        ));
    }

    let documents: Vec<DocumentUpload> = payload
        .document_url
        .iter()
        .filter(|u| !u.trim().is_empty())
        .map(|url| {
            let (document_name, file_type) = describe_document(url.trim());
            DocumentUpload {
                document_name,
                file_path: url.trim().to_string(),
                file_type,
            }
        })
        .collect();

    let txn = state.db.begin().await?;

    let created = car::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(current.id),
        brand: Set(payload.brand),
        model: Set(payload.model),
        name: Set(payload.name),
        description: Set(payload.description),
        base_price: Set(payload.base_price),
        deposit: Set(payload.deposit),
        car_status: Set(CarStatus::Available),
        car_approved: Set(Approval::No),
        color: Set(payload.color),
        license_plate: Set(license_plate),
        production_year: Set(payload.production_year),
        mileage: Set(payload.mileage),
        fuel_consumption: Set(payload.fuel_consumption),
        fuel_type: Set(payload.fuel_type),
        transmission_type: Set(payload.transmission_type),
        number_of_seats: Set(payload.number_of_seats),
        address: Set(payload.address),
        terms_of_use: Set(payload.terms_of_use),
        additional_functions: Set(payload.additional_functions),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(&txn)
    .await?;

    insert_images(&txn, created.id, &payload.image_url).await?;
    insert_documents(&txn, created.id, &documents).await?;
    let response = with_detail(&txn, created).await?;

    txn.commit().await?;

    tracing::info!(car_id = %response.car.id, owner_id = %current.id, "Car listed");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Owner edit; approval is always withdrawn
pub async fn update_car(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateCarRequest>,
) -> AppResult<Json<CarResponse>> {
    let found = find_car(&state.db, id).await?;
    policy::owner(&current, found.user_id, "Not authorized to update this car").check()?;
    validate_numbers(payload.base_price, payload.deposit, payload.number_of_seats)?;

    if let Some(status) = payload.car_status {
        if status != found.car_status && has_active_booking(&state.db, id).await?.is_some() {
            return Err(AppError::BadRequest(
                "Cannot change car status while it has an active booking".to_string(),
            ));
        }
    }

    let mut active: car::ActiveModel = found.into();
    if let Some(v) = payload.brand {
        active.brand = Set(v);
    }
    if let Some(v) = payload.model {
        active.model = Set(v);
    }
    if let Some(v) = payload.name {
        active.name = Set(v);
    }
    if let Some(v) = payload.description {
        active.description = Set(v);
    }
    if let Some(v) = payload.base_price {
        active.base_price = Set(v);
    }
    if let Some(v) = payload.deposit {
        active.deposit = Set(v);
    }
    if let Some(v) = payload.car_status {
        active.car_status = Set(v);
    }
    if let Some(v) = payload.color {
        active.color = Set(v);
    }
    if let Some(v) = payload.license_plate {
        active.license_plate = Set(v.trim().to_string());
    }
    if let Some(v) = payload.production_year {
        active.production_year = Set(v);
    }
    if let Some(v) = payload.mileage {
        active.mileage = Set(v);
    }
    if let Some(v) = payload.fuel_consumption {
        active.fuel_consumption = Set(v);
    }
    if let Some(v) = payload.fuel_type {
        active.fuel_type = Set(v);
    }
    if let Some(v) = payload.transmission_type {
        active.transmission_type = Set(v);
    }
    if let Some(v) = payload.number_of_seats {
        active.number_of_seats = Set(v);
    }
    if let Some(v) = payload.address {
        active.address = Set(v);
    }
    if let Some(v) = payload.terms_of_use {
        active.terms_of_use = Set(v);
    }
    if let Some(v) = payload.additional_functions {
        active.additional_functions = Set(Some(v));
    }
    active.car_approved = Set(Approval::No);
    active.updated_at = Set(now());

    let updated = active.update(&state.db).await?;
    Ok(Json(with_detail(&state.db, updated).await?))
}

/// Remove a car with its media (admin). Bookings and feedback go with it.
pub async fn delete_car(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let found = find_car(&state.db, id).await?;

    let txn = state.db.begin().await?;
    car_image::Entity::delete_many()
        .filter(car_image::Column::CarId.eq(found.id))
        .exec(&txn)
        .await?;
    car_document::Entity::delete_many()
        .filter(car_document::Column::CarId.eq(found.id))
        .exec(&txn)
        .await?;
    car::Entity::delete_by_id(found.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(car_id = %id, deleted_by = %current.id, "Car deleted");
    Ok(Json(MessageResponse::new("Car removed")))
}

pub async fn update_car_approval(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ApprovalRequest>,
) -> AppResult<Json<CarResponse>> {
    let found = find_car(&state.db, id).await?;

    let mut active: car::ActiveModel = found.into();
    active.car_approved = Set(payload.car_approved);
    active.updated_at = Set(now());
    let updated = active.update(&state.db).await?;

    tracing::info!(car_id = %id, approved = ?payload.car_approved, "Car approval changed");
    Ok(Json(with_detail(&state.db, updated).await?))
}

/// Owner moves the car's current booking along
pub async fn update_car_status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<BookingStatusRequest>,
) -> AppResult<Json<booking::Model>> {
    let found = find_car(&state.db, id).await?;
    policy::owner(&current, found.user_id, "Not authorized to update this car").check()?;

    let active_booking = has_active_booking(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("No active booking found for this car".to_string()))?;

    let txn = state.db.begin().await?;
    let updated = workflow::transition_booking(&txn, active_booking, payload.status).await?;
    txn.commit().await?;

    Ok(Json(updated))
}

/// Flattened feedback left on any booking of the car
pub async fn car_feedback(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<CarFeedbackEntry>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::CarId.eq(car_id))
        .all(&state.db)
        .await?;
    if bookings.is_empty() {
        return Err(AppError::NotFound("No bookings found for this car".to_string()));
    }

    let feedbacks = feedback::Entity::find()
        .filter(feedback::Column::BookingId.is_in(bookings.iter().map(|b| b.id).collect::<Vec<_>>()))
        .order_by_desc(feedback::Column::Date)
        .all(&state.db)
        .await?;
    if feedbacks.is_empty() {
        return Err(AppError::NotFound("No feedback found for this car".to_string()));
    }

    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(bookings.iter().map(|b| b.user_id).collect::<Vec<_>>()))
        .all(&state.db)
        .await?;

    let entries = feedbacks
        .into_iter()
        .map(|f| {
            let username = bookings
                .iter()
                .find(|b| b.id == f.booking_id)
                .and_then(|b| users.iter().find(|u| u.id == b.user_id))
                .map(|u| u.name.clone())
                .unwrap_or_default();
            CarFeedbackEntry {
                content: f.content,
                rating: f.rating,
                date: f.date,
                username,
            }
        })
        .collect();

    Ok(Json(entries))
}

/// Record already-hosted image URLs for a car
pub async fn add_car_images(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<AddImagesRequest>,
) -> AppResult<Json<CarResponse>> {
    let found = find_car(&state.db, id).await?;
    policy::owner_or_admin(&current, found.user_id, "Not authorized to update this car").check()?;

    if payload.urls.iter().all(|u| u.trim().is_empty()) {
        return Err(AppError::BadRequest("No images provided".to_string()));
    }

    let txn = state.db.begin().await?;
    insert_images(&txn, id, &payload.urls).await?;
    let updated = reset_approval(&txn, found).await?;
    let response = with_detail(&txn, updated).await?;
    txn.commit().await?;

    Ok(Json(response))
}

pub async fn add_car_documents(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<AddDocumentsRequest>,
) -> AppResult<Json<CarResponse>> {
    let found = find_car(&state.db, id).await?;
    policy::owner_or_admin(&current, found.user_id, "Not authorized to update this car").check()?;

    if payload.documents.is_empty() {
        return Err(AppError::BadRequest("No documents provided".to_string()));
    }

    let txn = state.db.begin().await?;
    insert_documents(&txn, id, &payload.documents).await?;
    let updated = reset_approval(&txn, found).await?;
    let response = with_detail(&txn, updated).await?;
    txn.commit().await?;

    Ok(Json(response))
}
