use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::car::{self, Approval, CarStatus};
use crate::entities::{now, user};
use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppPath, CarSummary, MessageResponse, UserSummary};
use crate::middleware::auth::CurrentUser;
use crate::policy;
use crate::workflow;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub car_id: Uuid,
    pub start_date_time: DateTime<FixedOffset>,
    pub end_date_time: DateTime<FixedOffset>,
    pub payment_method: String,
    pub drivers_information: Option<String>,
    pub driver_id: Option<Uuid>,
    pub renter_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct BookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub car: Option<CarSummary>,
    pub user: Option<UserSummary>,
}

async fn find_booking<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<booking::Model> {
    booking::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

async fn with_details<C: ConnectionTrait>(
    db: &C,
    bookings: Vec<booking::Model>,
) -> AppResult<Vec<BookingResponse>> {
    let cars = car::Entity::find()
        .filter(car::Column::Id.is_in(bookings.iter().map(|b| b.car_id).collect::<Vec<_>>()))
        .all(db)
        .await?;
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(bookings.iter().map(|b| b.user_id).collect::<Vec<_>>()))
        .all(db)
        .await?;

    Ok(bookings
        .into_iter()
        .map(|b| BookingResponse {
            car: cars.iter().find(|c| c.id == b.car_id).map(CarSummary::from),
            user: users.iter().find(|u| u.id == b.user_id).map(UserSummary::from),
            booking: b,
        })
        .collect())
}

async fn with_detail<C: ConnectionTrait>(db: &C, booking: booking::Model) -> AppResult<BookingResponse> {
    with_details(db, vec![booking])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Booking details missing".to_string()))
}

/// Book an approved, available car. The car is reserved in the same transaction.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let car = car::Entity::find_by_id(payload.car_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    if car.user_id == current.id {
        return Err(AppError::BadRequest("You cannot book your own car".to_string()));
    }
    if car.car_approved != Approval::Yes {
        return Err(AppError::BadRequest("Car is not approved for booking".to_string()));
    }
    if car.car_status != CarStatus::Available {
        return Err(AppError::BadRequest("Car is not available".to_string()));
    }

    let total_amount =
        workflow::quote_booking(&car, payload.start_date_time, payload.end_date_time)?;

    let txn = state.db.begin().await?;

    if !workflow::reserve_car(&txn, car.id).await? {
        return Err(AppError::BadRequest("Car is not available".to_string()));
    }

    let created = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        car_id: Set(car.id),
        user_id: Set(current.id),
        driver_id: Set(payload.driver_id),
        renter_id: Set(payload.renter_id),
        start_date_time: Set(payload.start_date_time),
        end_date_time: Set(payload.end_date_time),
        booking_status: Set(BookingStatus::Pending),
        total_amount: Set(total_amount),
        deposit: Set(car.deposit),
        payment_method: Set(payload.payment_method),
        drivers_information: Set(Some(
            payload
                .drivers_information
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| current.name.clone()),
        )),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(&txn)
    .await?;

    let response = with_detail(&txn, created).await?;
    txn.commit().await?;

    tracing::info!(
        booking_id = %response.booking.id,
        car_id = %car.id,
        user_id = %current.id,
        total_amount,
        "Booking created"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(current.id))
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, bookings).await?))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let found = find_booking(&state.db, id).await?;
    policy::owner_or_admin(&current, found.user_id, "Not authorized to view this booking")
        .check()?;
    Ok(Json(with_detail(&state.db, found).await?))
}

/// All bookings (admin)
pub async fn list_bookings(State(state): State<AppState>) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, bookings).await?))
}

pub async fn update_booking_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<BookingStatusRequest>,
) -> AppResult<Json<BookingResponse>> {
    let found = find_booking(&state.db, id).await?;

    let txn = state.db.begin().await?;
    let updated = workflow::transition_booking(&txn, found, payload.status).await?;
    let response = with_detail(&txn, updated).await?;
    txn.commit().await?;

    Ok(Json(response))
}

/// Delete a booking (admin); a still-active booking hands its car back
pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let found = find_booking(&state.db, id).await?;

    let txn = state.db.begin().await?;
    if found.booking_status.is_active() {
        workflow::release_car(&txn, found.car_id).await?;
    }
    booking::Entity::delete_by_id(found.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(booking_id = %id, deleted_by = %current.id, "Booking deleted");
    Ok(Json(MessageResponse::new("Booking removed")))
}
