use sea_orm_migration::{prelude::*, schema::*};

use super::m20250601_000001_create_access_control::Role;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Name, 100).not_null())
                    .col(string_len(User::Email, 255).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len_null(User::Address, 255))
                    .col(string_len_null(User::PhoneNo, 30))
                    .col(date_null(User::DateOfBirth))
                    .col(string_len_null(User::DrivingLicense, 50))
                    .col(string_len_null(User::NationalIdNo, 50))
                    .col(double(User::Wallet).not_null().default(0.0))
                    .col(text_null(User::RefreshToken))
                    .col(uuid_null(User::RoleId))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(User::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_role")
                            .from(User::Table, User::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    Address,
    PhoneNo,
    DateOfBirth,
    DrivingLicense,
    NationalIdNo,
    Wallet,
    RefreshToken,
    RoleId,
    CreatedAt,
    UpdatedAt,
}
