use sea_orm_migration::{prelude::*, schema::*};

use super::m20250601_000002_create_users::User;
use super::m20250601_000003_create_cars::Car;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::CarId).not_null())
                    .col(uuid(Booking::UserId).not_null())
                    .col(uuid_null(Booking::DriverId))
                    .col(uuid_null(Booking::RenterId))
                    .col(timestamp_with_time_zone(Booking::StartDateTime).not_null())
                    .col(timestamp_with_time_zone(Booking::EndDateTime).not_null())
                    .col(
                        string_len(Booking::BookingStatus, 20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(double(Booking::TotalAmount).not_null())
                    .col(double(Booking::Deposit).not_null())
                    .col(string_len(Booking::PaymentMethod, 50).not_null())
                    .col(text_null(Booking::DriversInformation))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Booking::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_car")
                            .from(Booking::Table, Booking::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_user")
                            .from(Booking::Table, Booking::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_driver")
                            .from(Booking::Table, Booking::DriverId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_renter")
                            .from(Booking::Table, Booking::RenterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    CarId,
    UserId,
    DriverId,
    RenterId,
    StartDateTime,
    EndDateTime,
    BookingStatus,
    TotalAmount,
    Deposit,
    PaymentMethod,
    DriversInformation,
    CreatedAt,
    UpdatedAt,
}
