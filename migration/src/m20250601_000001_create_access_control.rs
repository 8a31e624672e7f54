use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Role::Table)
                    .if_not_exists()
                    .col(uuid(Role::Id).primary_key())
                    .col(string_len(Role::Name, 50).not_null().unique_key())
                    .col(text_null(Role::Description))
                    .col(boolean(Role::Active).not_null().default(true))
                    .col(
                        timestamp_with_time_zone(Role::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Permission::Table)
                    .if_not_exists()
                    .col(uuid(Permission::Id).primary_key())
                    .col(string_len(Permission::Name, 100).not_null().unique_key())
                    .col(string_len(Permission::Module, 50).not_null())
                    .col(string_len(Permission::Method, 10).not_null())
                    .col(string_len(Permission::ApiPath, 255).not_null())
                    .col(
                        timestamp_with_time_zone(Permission::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PermissionRole::Table)
                    .if_not_exists()
                    .col(uuid(PermissionRole::Id).primary_key())
                    .col(uuid(PermissionRole::RoleId).not_null())
                    .col(uuid(PermissionRole::PermissionId).not_null())
                    .col(
                        timestamp_with_time_zone(PermissionRole::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permission_role_role")
                            .from(PermissionRole::Table, PermissionRole::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permission_role_permission")
                            .from(PermissionRole::Table, PermissionRole::PermissionId)
                            .to(Permission::Table, Permission::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_permission_role_pair")
                    .table(PermissionRole::Table)
                    .col(PermissionRole::RoleId)
                    .col(PermissionRole::PermissionId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PermissionRole::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Permission::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Role::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Role {
    Table,
    Id,
    Name,
    Description,
    Active,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Permission {
    Table,
    Id,
    Name,
    Module,
    Method,
    ApiPath,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum PermissionRole {
    Table,
    Id,
    RoleId,
    PermissionId,
    CreatedAt,
}
