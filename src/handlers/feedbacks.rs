use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::{car, feedback, now, user};
use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppPath, CarSummary, MessageResponse, UserSummary};
use crate::middleware::auth::CurrentUser;
use crate::policy;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateFeedbackRequest {
    pub booking_id: Uuid,
    pub content: String,
    pub rating: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFeedbackRequest {
    pub content: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackBooking {
    pub id: Uuid,
    pub start_date_time: DateTime<FixedOffset>,
    pub end_date_time: DateTime<FixedOffset>,
    pub user: Option<UserSummary>,
    pub car: Option<CarSummary>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    #[serde(flatten)]
    pub feedback: feedback::Model,
    pub booking: Option<FeedbackBooking>,
}

fn validate_rating(rating: i32) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".to_string()));
    }
    Ok(())
}

async fn find_feedback<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<feedback::Model> {
    feedback::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Feedback not found".to_string()))
}

async fn with_details<C: ConnectionTrait>(
    db: &C,
    feedbacks: Vec<feedback::Model>,
) -> AppResult<Vec<FeedbackResponse>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::Id.is_in(feedbacks.iter().map(|f| f.booking_id).collect::<Vec<_>>()))
        .all(db)
        .await?;
    let cars = car::Entity::find()
        .filter(car::Column::Id.is_in(bookings.iter().map(|b| b.car_id).collect::<Vec<_>>()))
        .all(db)
        .await?;
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(bookings.iter().map(|b| b.user_id).collect::<Vec<_>>()))
        .all(db)
        .await?;

    Ok(feedbacks
        .into_iter()
        .map(|f| {
            let booking = bookings.iter().find(|b| b.id == f.booking_id).map(|b| FeedbackBooking {
                id: b.id,
                start_date_time: b.start_date_time,
                end_date_time: b.end_date_time,
                user: users.iter().find(|u| u.id == b.user_id).map(UserSummary::from),
                car: cars.iter().find(|c| c.id == b.car_id).map(CarSummary::from),
            });
            FeedbackResponse { feedback: f, booking }
        })
        .collect())
}

async fn with_detail<C: ConnectionTrait>(db: &C, feedback: feedback::Model) -> AppResult<FeedbackResponse> {
    with_details(db, vec![feedback])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Feedback details missing".to_string()))
}

/// Review a completed booking; one review per booking
pub async fn create_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateFeedbackRequest>,
) -> AppResult<(StatusCode, Json<FeedbackResponse>)> {
    validate_rating(payload.rating)?;
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Feedback content is required".to_string()));
    }

    let booking = booking::Entity::find_by_id(payload.booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    policy::owner(
        &current,
        booking.user_id,
        "Not authorized to leave feedback for this booking",
    )
    .check()?;

    if booking.booking_status != BookingStatus::Completed {
        return Err(AppError::BadRequest(
            "Feedback can only be left for completed bookings".to_string(),
        ));
    }

    let existing = feedback::Entity::find()
        .filter(feedback::Column::BookingId.eq(booking.id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest(
            "Feedback already exists for this booking".to_string(),
        ));
    }

    let created = feedback::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        content: Set(content.to_string()),
        rating: Set(payload.rating),
        date: Set(now()),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(feedback_id = %created.id, booking_id = %booking.id, rating = created.rating, "Feedback created");
    Ok((StatusCode::CREATED, Json(with_detail(&state.db, created).await?)))
}

pub async fn list_feedbacks(State(state): State<AppState>) -> AppResult<Json<Vec<FeedbackResponse>>> {
    let feedbacks = feedback::Entity::find()
        .order_by_desc(feedback::Column::Date)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, feedbacks).await?))
}

/// Feedback left on any booking of one car, newest first
pub async fn feedbacks_by_car(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<FeedbackResponse>>> {
    let booking_ids: Vec<Uuid> = booking::Entity::find()
        .filter(booking::Column::CarId.eq(car_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|b| b.id)
        .collect();

    let feedbacks = feedback::Entity::find()
        .filter(feedback::Column::BookingId.is_in(booking_ids))
        .order_by_desc(feedback::Column::Date)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, feedbacks).await?))
}

pub async fn get_feedback(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<FeedbackResponse>> {
    let found = find_feedback(&state.db, id).await?;
    Ok(Json(with_detail(&state.db, found).await?))
}

/// Edit one's own feedback
pub async fn update_feedback(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateFeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    let found = find_feedback(&state.db, id).await?;
    let booking = booking::Entity::find_by_id(found.booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    policy::owner(&current, booking.user_id, "Not authorized to update this feedback").check()?;

    if let Some(rating) = payload.rating {
        validate_rating(rating)?;
    }

    let mut active: feedback::ActiveModel = found.into();
    if let Some(content) = payload.content.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
        active.content = Set(content);
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    active.updated_at = Set(now());

    let updated = active.update(&state.db).await?;
    Ok(Json(with_detail(&state.db, updated).await?))
}

/// Delete feedback (admin)
pub async fn delete_feedback(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let found = find_feedback(&state.db, id).await?;
    feedback::Entity::delete_by_id(found.id).exec(&state.db).await?;
    Ok(Json(MessageResponse::new("Feedback removed")))
}
