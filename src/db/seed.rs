use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::{now, permission, permission_role, role, user};
use crate::error::AppResult;
use crate::utils::password::hash_password;

/// Permissions every role gets out of the box: (name, module, method, api_path)
const DEFAULT_PERMISSIONS: &[(&str, &str, &str, &str)] = &[
    ("create_car", "cars", "POST", "/cars"),
    ("update_car", "cars", "PUT", "/cars/{id}"),
    ("create_booking", "bookings", "POST", "/bookings"),
    ("create_feedback", "feedbacks", "POST", "/feedbacks"),
    ("create_transaction", "transactions", "POST", "/transactions"),
];

/// Create the `admin` and `user` roles and grant them the default permissions.
/// Safe to run on every start.
pub async fn seed_access_control<C: ConnectionTrait>(db: &C) -> AppResult<()> {
    let admin = ensure_role(db, role::ADMIN, "Platform administrator").await?;
    let member = ensure_role(db, role::USER, "Registered customer").await?;

    for (name, module, method, api_path) in DEFAULT_PERMISSIONS {
        let permission = match permission::Entity::find()
            .filter(permission::Column::Name.eq(*name))
            .one(db)
            .await?
        {
            Some(p) => p,
            None => {
                permission::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(name.to_string()),
                    module: Set(module.to_string()),
                    method: Set(method.to_string()),
                    api_path: Set(api_path.to_string()),
                    created_at: Set(now()),
                }
                .insert(db)
                .await?
            }
        };

        for role_id in [admin.id, member.id] {
            grant(db, role_id, permission.id).await?;
        }
    }

    tracing::info!("Access control seeded");
    Ok(())
}

/// Seed the admin account if configured and missing
pub async fn seed_admin<C: ConnectionTrait>(db: &C, config: &Config) -> AppResult<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let admin_role = role::Entity::find()
        .filter(role::Column::Name.eq(role::ADMIN))
        .one(db)
        .await?;

    let admin = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Admin".to_string()),
        email: Set(email.clone()),
        password_hash: Set(hash_password(password)?),
        wallet: Set(0.0),
        role_id: Set(admin_role.map(|r| r.id)),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    };
    admin.insert(db).await?;

    tracing::info!(email = %email, "Admin account created");
    Ok(())
}

async fn ensure_role<C: ConnectionTrait>(
    db: &C,
    name: &str,
    description: &str,
) -> AppResult<role::Model> {
    if let Some(existing) = role::Entity::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let created = role::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(Some(description.to_string())),
        active: Set(true),
        created_at: Set(now()),
    }
    .insert(db)
    .await?;
    Ok(created)
}

async fn grant<C: ConnectionTrait>(db: &C, role_id: Uuid, permission_id: Uuid) -> AppResult<()> {
    let linked = permission_role::Entity::find()
        .filter(permission_role::Column::RoleId.eq(role_id))
        .filter(permission_role::Column::PermissionId.eq(permission_id))
        .one(db)
        .await?;

    if linked.is_none() {
        permission_role::ActiveModel {
            id: Set(Uuid::new_v4()),
            role_id: Set(role_id),
            permission_id: Set(permission_id),
            created_at: Set(now()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}
