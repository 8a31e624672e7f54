use sea_orm_migration::{prelude::*, schema::*};

use super::m20250601_000004_create_bookings::Booking;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One feedback per booking is enforced by the unique key as well as in the handler
        manager
            .create_table(
                Table::create()
                    .table(Feedback::Table)
                    .if_not_exists()
                    .col(uuid(Feedback::Id).primary_key())
                    .col(uuid(Feedback::BookingId).not_null().unique_key())
                    .col(text(Feedback::Content).not_null())
                    .col(integer(Feedback::Rating).not_null())
                    .col(timestamp_with_time_zone(Feedback::Date).not_null())
                    .col(
                        timestamp_with_time_zone(Feedback::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Feedback::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_feedback_booking")
                            .from(Feedback::Table, Feedback::BookingId)
                            .to(Booking::Table, Booking::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Feedback::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Feedback {
    Table,
    Id,
    BookingId,
    Content,
    Rating,
    Date,
    CreatedAt,
    UpdatedAt,
}
