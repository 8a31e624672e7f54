use sea_orm_migration::{prelude::*, schema::*};

use super::m20250601_000002_create_users::User;
use super::m20250601_000004_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transaction::Table)
                    .if_not_exists()
                    .col(uuid(Transaction::Id).primary_key())
                    .col(double(Transaction::Amount).not_null())
                    .col(double(Transaction::NetAmount).not_null())
                    .col(double(Transaction::Fee).not_null().default(0.0))
                    .col(string_len(Transaction::Currency, 10).not_null().default("USD"))
                    .col(string_len(Transaction::PaymentType, 50).not_null())
                    .col(string_len_null(Transaction::PaymentReferenceId, 255))
                    .col(string_len(Transaction::TransactionType, 20).not_null())
                    .col(
                        string_len(Transaction::Status, 20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(text_null(Transaction::Description))
                    .col(text_null(Transaction::FailureReason))
                    .col(timestamp_with_time_zone(Transaction::TransactionDate).not_null())
                    .col(uuid_null(Transaction::BookingId))
                    .col(uuid_null(Transaction::RefundTransactionId))
                    .col(uuid(Transaction::SenderId).not_null())
                    .col(uuid(Transaction::RecipientId).not_null())
                    .col(
                        timestamp_with_time_zone(Transaction::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Transaction::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_booking")
                            .from(Transaction::Table, Transaction::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_refund_of")
                            .from(Transaction::Table, Transaction::RefundTransactionId)
                            .to(Transaction::Table, Transaction::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_sender")
                            .from(Transaction::Table, Transaction::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transaction_recipient")
                            .from(Transaction::Table, Transaction::RecipientId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transaction::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Transaction {
    Table,
    Id,
    Amount,
    NetAmount,
    Fee,
    Currency,
    PaymentType,
    PaymentReferenceId,
    TransactionType,
    Status,
    Description,
    FailureReason,
    TransactionDate,
    BookingId,
    RefundTransactionId,
    SenderId,
    RecipientId,
    CreatedAt,
    UpdatedAt,
}
