//! Booking and transaction state changes together with the side effects
//! they cascade into (car availability, wallet balances).
//!
//! Every function takes a generic connection so callers can run several
//! steps inside one database transaction.

use chrono::{DateTime, FixedOffset};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::car::{self, CarStatus};
use crate::entities::transaction::{self, TransactionStatus, TransactionType};
use crate::entities::{now, user};
use crate::error::{AppError, AppResult};
use crate::utils::pricing::{rental_days, rental_total};

/// Price of renting `car` between `start` and `end`
pub fn quote_booking(
    car: &car::Model,
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> AppResult<f64> {
    let days = rental_days(start, end);
    if days <= 0 {
        return Err(AppError::BadRequest("Invalid booking duration".to_string()));
    }
    Ok(rental_total(days, car.base_price))
}

/// Flip an available car to unavailable. Returns false when another booking got there first.
pub async fn reserve_car<C: ConnectionTrait>(db: &C, car_id: Uuid) -> AppResult<bool> {
    let result = car::Entity::update_many()
        .col_expr(car::Column::CarStatus, Expr::value(CarStatus::Unavailable))
        .col_expr(car::Column::UpdatedAt, Expr::value(now()))
        .filter(car::Column::Id.eq(car_id))
        .filter(car::Column::CarStatus.eq(CarStatus::Available))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

pub async fn release_car<C: ConnectionTrait>(db: &C, car_id: Uuid) -> AppResult<()> {
    car::Entity::update_many()
        .col_expr(car::Column::CarStatus, Expr::value(CarStatus::Available))
        .col_expr(car::Column::UpdatedAt, Expr::value(now()))
        .filter(car::Column::Id.eq(car_id))
        .exec(db)
        .await?;
    tracing::info!(car_id = %car_id, "Car released");
    Ok(())
}

/// Free the cars held by a user's pending or confirmed bookings.
/// Run before the user row goes, since its bookings cascade away with it.
pub async fn release_user_bookings<C: ConnectionTrait>(db: &C, user_id: Uuid) -> AppResult<usize> {
    let open: Vec<booking::Model> = booking::Entity::find()
        .filter(booking::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .filter(|b| b.booking_status.is_active())
        .collect();

    for held in &open {
        release_car(db, held.car_id).await?;
    }
    Ok(open.len())
}

/// Move a booking to `next`; leaving the active states frees the car
pub async fn transition_booking<C: ConnectionTrait>(
    db: &C,
    booking: booking::Model,
    next: BookingStatus,
) -> AppResult<booking::Model> {
    let current = booking.booking_status;
    if !current.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Invalid status transition from {} to {}",
            current.to_value(),
            next.to_value()
        )));
    }

    let car_id = booking.car_id;
    let mut active: booking::ActiveModel = booking.into();
    active.booking_status = Set(next);
    active.updated_at = Set(now());
    let updated = active.update(db).await?;

    if next.releases_car() {
        release_car(db, car_id).await?;
    }

    tracing::info!(
        booking_id = %updated.id,
        from = %current.to_value(),
        to = %next.to_value(),
        "Booking status changed"
    );
    Ok(updated)
}

/// Confirmation triggered by a payment against the booking.
/// Already-confirmed bookings are left alone; finished ones cannot be paid.
pub async fn confirm_for_payment<C: ConnectionTrait>(
    db: &C,
    booking: booking::Model,
) -> AppResult<booking::Model> {
    match booking.booking_status {
        BookingStatus::Pending => transition_booking(db, booking, BookingStatus::Confirmed).await,
        BookingStatus::Confirmed => Ok(booking),
        BookingStatus::Cancelled | BookingStatus::Completed => Err(AppError::BadRequest(
            "Booking is no longer open for payment".to_string(),
        )),
    }
}

/// Settle a pending transaction; completion applies its wallet effect.
/// The status flip is conditional on the row still being pending, so a stale
/// `txn` can never settle twice.
pub async fn settle_transaction<C: ConnectionTrait>(
    db: &C,
    txn: transaction::Model,
    next: TransactionStatus,
) -> AppResult<transaction::Model> {
    if !txn.status.can_transition_to(next) {
        return Err(AppError::BadRequest(format!(
            "Invalid status transition from {} to {}",
            txn.status.to_value(),
            next.to_value()
        )));
    }

    let claimed = transaction::Entity::update_many()
        .col_expr(transaction::Column::Status, Expr::value(next))
        .col_expr(transaction::Column::UpdatedAt, Expr::value(now()))
        .filter(transaction::Column::Id.eq(txn.id))
        .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
        .exec(db)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(AppError::BadRequest(
            "Transaction is no longer pending".to_string(),
        ));
    }

    if next == TransactionStatus::Completed {
        apply_wallet_effect(db, &txn).await?;
    }

    transaction::Entity::find_by_id(txn.id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
}

async fn apply_wallet_effect<C: ConnectionTrait>(
    db: &C,
    txn: &transaction::Model,
) -> AppResult<()> {
    match txn.transaction_type {
        TransactionType::Payment | TransactionType::Deposit => {
            adjust_wallet(db, txn.recipient_id, txn.net_amount).await?;
            tracing::info!(
                transaction_id = %txn.id,
                user_id = %txn.recipient_id,
                amount = txn.net_amount,
                "Wallet credited"
            );
        }
        TransactionType::Withdrawal => {
            debit_wallet(db, txn.sender_id, txn.amount).await?;
            tracing::info!(
                transaction_id = %txn.id,
                user_id = %txn.sender_id,
                amount = txn.amount,
                "Wallet debited"
            );
        }
        TransactionType::Refund => {
            // the refunding party gives back what it was credited
            debit_wallet(db, txn.sender_id, txn.net_amount).await?;
            tracing::info!(
                transaction_id = %txn.id,
                user_id = %txn.sender_id,
                amount = txn.net_amount,
                "Refund debited"
            );
        }
    }
    Ok(())
}

/// Atomic `wallet = wallet + delta`
async fn adjust_wallet<C: ConnectionTrait>(db: &C, user_id: Uuid, delta: f64) -> AppResult<()> {
    let result = user::Entity::update_many()
        .col_expr(user::Column::Wallet, Expr::col(user::Column::Wallet).add(delta))
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

/// Atomic `wallet = wallet - amount`, refused when the balance would go negative
async fn debit_wallet<C: ConnectionTrait>(db: &C, user_id: Uuid, amount: f64) -> AppResult<()> {
    let result = user::Entity::update_many()
        .col_expr(user::Column::Wallet, Expr::col(user::Column::Wallet).sub(amount))
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::Wallet.gte(amount))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return match user::Entity::find_by_id(user_id).one(db).await? {
            Some(_) => Err(AppError::BadRequest("Insufficient wallet balance".to_string())),
            None => Err(AppError::NotFound("User not found".to_string())),
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn car_priced(base_price: f64) -> car::Model {
        car::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            brand: "Toyota".to_string(),
            model: "Vios".to_string(),
            name: "Vios 2022".to_string(),
            description: "Compact sedan".to_string(),
            base_price,
            deposit: 100.0,
            car_status: CarStatus::Available,
            car_approved: car::Approval::Yes,
            color: "white".to_string(),
            license_plate: "51A-12345".to_string(),
            production_year: 2022,
            mileage: 12000.0,
            fuel_consumption: 6.5,
            fuel_type: "petrol".to_string(),
            transmission_type: "automatic".to_string(),
            number_of_seats: 5,
            address: "District 1".to_string(),
            terms_of_use: "No smoking".to_string(),
            additional_functions: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_quote_three_days() {
        let start = now();
        let total = quote_booking(&car_priced(50.0), start, start + Duration::days(3)).unwrap();
        assert_eq!(total, 150.0);
    }

    #[test]
    fn test_quote_rounds_partial_day_up() {
        let start = now();
        let total = quote_booking(&car_priced(40.0), start, start + Duration::hours(30)).unwrap();
        assert_eq!(total, 80.0);
    }

    #[test]
    fn test_quote_rejects_empty_or_inverted_range() {
        let start = now();
        let car = car_priced(50.0);
        assert!(matches!(quote_booking(&car, start, start), Err(AppError::BadRequest(_))));
        assert!(matches!(
            quote_booking(&car, start, start - Duration::days(1)),
            Err(AppError::BadRequest(_))
        ));
    }
}
