use sea_orm_migration::{prelude::*, schema::*};

use super::m20250601_000002_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Car::Table)
                    .if_not_exists()
                    .col(uuid(Car::Id).primary_key())
                    .col(uuid(Car::UserId).not_null())
                    .col(string_len(Car::Brand, 100).not_null())
                    .col(string_len(Car::Model, 100).not_null())
                    .col(string_len(Car::Name, 150).not_null())
                    .col(text(Car::Description).not_null())
                    .col(double(Car::BasePrice).not_null())
                    .col(double(Car::Deposit).not_null())
                    .col(
                        string_len(Car::CarStatus, 20)
                            .not_null()
                            .default("available"),
                    )
                    .col(string_len(Car::CarApproved, 5).not_null().default("no"))
                    .col(string_len(Car::Color, 50).not_null())
                    .col(string_len(Car::LicensePlate, 30).not_null().unique_key())
                    .col(integer(Car::ProductionYear).not_null())
                    .col(double(Car::Mileage).not_null())
                    .col(double(Car::FuelConsumption).not_null())
                    .col(string_len(Car::FuelType, 50).not_null())
                    .col(string_len(Car::TransmissionType, 50).not_null())
                    .col(integer(Car::NumberOfSeats).not_null())
                    .col(string_len(Car::Address, 255).not_null())
                    .col(text(Car::TermsOfUse).not_null())
                    .col(text_null(Car::AdditionalFunctions))
                    .col(
                        timestamp_with_time_zone(Car::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Car::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_owner")
                            .from(Car::Table, Car::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CarImage::Table)
                    .if_not_exists()
                    .col(uuid(CarImage::Id).primary_key())
                    .col(uuid(CarImage::CarId).not_null())
                    .col(text(CarImage::FilePath).not_null())
                    .col(
                        timestamp_with_time_zone(CarImage::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_image_car")
                            .from(CarImage::Table, CarImage::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CarDocument::Table)
                    .if_not_exists()
                    .col(uuid(CarDocument::Id).primary_key())
                    .col(uuid(CarDocument::CarId).not_null())
                    .col(string_len(CarDocument::DocumentName, 255).not_null())
                    .col(text(CarDocument::FilePath).not_null())
                    .col(string_len(CarDocument::FileType, 50).not_null())
                    .col(
                        timestamp_with_time_zone(CarDocument::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_document_car")
                            .from(CarDocument::Table, CarDocument::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CarDocument::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CarImage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Car::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Car {
    Table,
    Id,
    UserId,
    Brand,
    Model,
    Name,
    Description,
    BasePrice,
    Deposit,
    CarStatus,
    CarApproved,
    Color,
    LicensePlate,
    ProductionYear,
    Mileage,
    FuelConsumption,
    FuelType,
    TransmissionType,
    NumberOfSeats,
    Address,
    TermsOfUse,
    AdditionalFunctions,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum CarImage {
    Table,
    Id,
    CarId,
    FilePath,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum CarDocument {
    Table,
    Id,
    CarId,
    DocumentName,
    FilePath,
    FileType,
    CreatedAt,
}
