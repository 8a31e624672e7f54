use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::transaction::{self, TransactionStatus, TransactionType};
use crate::entities::{booking, now, user};
use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppPath, UserSummary};
use crate::middleware::auth::CurrentUser;
use crate::policy;
use crate::utils::pricing::fee_split;
use crate::workflow;
use crate::AppState;

const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub amount: f64,
    pub payment_type: String,
    pub transaction_type: TransactionType,
    pub description: Option<String>,
    pub booking_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub currency: Option<String>,
    pub payment_reference_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionStatusRequest {
    pub status: TransactionStatus,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionBooking {
    pub id: Uuid,
    pub start_date_time: DateTime<FixedOffset>,
    pub end_date_time: DateTime<FixedOffset>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    #[serde(flatten)]
    pub transaction: transaction::Model,
    pub sender: Option<UserSummary>,
    pub recipient: Option<UserSummary>,
    pub booking: Option<TransactionBooking>,
}

async fn find_transaction<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<transaction::Model> {
    transaction::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
}

async fn with_details<C: ConnectionTrait>(
    db: &C,
    transactions: Vec<transaction::Model>,
) -> AppResult<Vec<TransactionResponse>> {
    let user_ids: Vec<Uuid> = transactions
        .iter()
        .flat_map(|t| [t.sender_id, t.recipient_id])
        .collect();
    let booking_ids: Vec<Uuid> = transactions.iter().filter_map(|t| t.booking_id).collect();

    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?;
    let bookings = booking::Entity::find()
        .filter(booking::Column::Id.is_in(booking_ids))
        .all(db)
        .await?;

    Ok(transactions
        .into_iter()
        .map(|t| TransactionResponse {
            sender: users.iter().find(|u| u.id == t.sender_id).map(UserSummary::from),
            recipient: users.iter().find(|u| u.id == t.recipient_id).map(UserSummary::from),
            booking: t.booking_id.and_then(|bid| {
                bookings.iter().find(|b| b.id == bid).map(|b| TransactionBooking {
                    id: b.id,
                    start_date_time: b.start_date_time,
                    end_date_time: b.end_date_time,
                })
            }),
            transaction: t,
        })
        .collect())
}

async fn with_detail<C: ConnectionTrait>(
    db: &C,
    transaction: transaction::Model,
) -> AppResult<TransactionResponse> {
    with_details(db, vec![transaction])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Transaction details missing".to_string()))
}

/// Start a payment, deposit or withdrawal. Paying for a pending booking confirms it.
pub async fn create_transaction(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<TransactionResponse>)> {
    if payload.amount <= 0.0 {
        return Err(AppError::BadRequest("Amount must be greater than 0".to_string()));
    }
    if payload.transaction_type == TransactionType::Refund {
        return Err(AppError::BadRequest(
            "Refunds can only be issued from an existing transaction".to_string(),
        ));
    }

    let recipient_id = payload.recipient_id.unwrap_or(current.id);
    if user::Entity::find_by_id(recipient_id).one(&state.db).await?.is_none() {
        return Err(AppError::NotFound("Recipient not found".to_string()));
    }

    let booking = match payload.booking_id {
        Some(booking_id) => {
            let found = booking::Entity::find_by_id(booking_id)
                .one(&state.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
            policy::owner_or_admin(&current, found.user_id, "Not authorized to pay for this booking")
                .check()?;
            Some(found)
        }
        None => None,
    };

    let (fee, net_amount) = fee_split(payload.amount);

    let txn = state.db.begin().await?;

    if let Some(booking) = booking {
        workflow::confirm_for_payment(&txn, booking).await?;
    }

    let created = transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        amount: Set(payload.amount),
        net_amount: Set(net_amount),
        fee: Set(fee),
        currency: Set(payload
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())),
        payment_type: Set(payload.payment_type),
        payment_reference_id: Set(payload.payment_reference_id),
        transaction_type: Set(payload.transaction_type),
        status: Set(TransactionStatus::Pending),
        description: Set(payload.description),
        failure_reason: Set(None),
        transaction_date: Set(now()),
        booking_id: Set(payload.booking_id),
        refund_transaction_id: Set(None),
        sender_id: Set(current.id),
        recipient_id: Set(recipient_id),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(&txn)
    .await?;

    let response = with_detail(&txn, created).await?;
    txn.commit().await?;

    tracing::info!(
        transaction_id = %response.transaction.id,
        sender_id = %current.id,
        recipient_id = %recipient_id,
        amount = payload.amount,
        fee,
        "Transaction created"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

/// Transactions the caller sent or received
pub async fn my_transactions(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<Vec<TransactionResponse>>> {
    let transactions = transaction::Entity::find()
        .filter(
            Condition::any()
                .add(transaction::Column::SenderId.eq(current.id))
                .add(transaction::Column::RecipientId.eq(current.id)),
        )
        .order_by_desc(transaction::Column::TransactionDate)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, transactions).await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<TransactionResponse>> {
    let found = find_transaction(&state.db, id).await?;
    policy::party_or_admin(
        &current,
        found.sender_id,
        found.recipient_id,
        "Not authorized to view this transaction",
    )
    .check()?;
    Ok(Json(with_detail(&state.db, found).await?))
}

pub async fn list_transactions(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TransactionResponse>>> {
    let transactions = transaction::Entity::find()
        .order_by_desc(transaction::Column::TransactionDate)
        .all(&state.db)
        .await?;
    Ok(Json(with_details(&state.db, transactions).await?))
}

/// Settle a pending transaction (admin). Completion moves wallet funds.
pub async fn update_transaction_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<TransactionStatusRequest>,
) -> AppResult<Json<TransactionResponse>> {
    let txn = state.db.begin().await?;
    let found = find_transaction(&txn, id).await?;
    let mut settled = workflow::settle_transaction(&txn, found, payload.status).await?;
    if let Some(reason) = payload.failure_reason.filter(|r| !r.trim().is_empty()) {
        let mut active: transaction::ActiveModel = settled.into();
        active.failure_reason = Set(Some(reason));
        settled = active.update(&txn).await?;
    }
    let response = with_detail(&txn, settled).await?;
    txn.commit().await?;

    tracing::info!(transaction_id = %id, status = ?payload.status, "Transaction settled");
    Ok(Json(response))
}

/// Issue a pending, fee-free refund reversing a completed transaction (admin)
pub async fn create_refund(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<(StatusCode, Json<TransactionResponse>)> {
    let original = find_transaction(&state.db, id).await?;

    if original.transaction_type == TransactionType::Refund {
        return Err(AppError::BadRequest(
            "Refund transactions cannot be refunded".to_string(),
        ));
    }
    if original.status != TransactionStatus::Completed {
        return Err(AppError::BadRequest(
            "Only completed transactions can be refunded".to_string(),
        ));
    }

    let live_refund = transaction::Entity::find()
        .filter(transaction::Column::RefundTransactionId.eq(original.id))
        .filter(
            transaction::Column::Status
                .is_not_in([TransactionStatus::Failed, TransactionStatus::Cancelled]),
        )
        .one(&state.db)
        .await?;
    if live_refund.is_some() {
        return Err(AppError::BadRequest(
            "Transaction has already been refunded".to_string(),
        ));
    }

    let refund = transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        amount: Set(original.amount),
        net_amount: Set(original.net_amount),
        fee: Set(0.0),
        currency: Set(original.currency.clone()),
        payment_type: Set(original.payment_type.clone()),
        payment_reference_id: Set(None),
        transaction_type: Set(TransactionType::Refund),
        status: Set(TransactionStatus::Pending),
        description: Set(Some(format!("Refund for transaction {}", original.id))),
        failure_reason: Set(None),
        transaction_date: Set(now()),
        booking_id: Set(original.booking_id),
        refund_transaction_id: Set(Some(original.id)),
        sender_id: Set(original.recipient_id),
        recipient_id: Set(original.sender_id),
        created_at: Set(now()),
        updated_at: Set(now()),
    }
    .insert(&state.db)
    .await?;

    tracing::info!(
        refund_id = %refund.id,
        original_id = %original.id,
        issued_by = %current.id,
        "Refund issued"
    );
    Ok((StatusCode::CREATED, Json(with_detail(&state.db, refund).await?)))
}
