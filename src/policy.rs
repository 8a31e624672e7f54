//! Authorization predicates evaluated before a handler touches state.
//!
//! Each predicate answers with [`Access`]; a denial carries the reason that
//! ends up in the 403 body.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::{permission, permission_role};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CurrentUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(&'static str),
}

impl Access {
    pub fn check(self) -> AppResult<()> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny(reason) => Err(AppError::Forbidden(reason.to_string())),
        }
    }

    pub fn is_allowed(self) -> bool {
        self == Access::Allow
    }
}

pub fn admin(user: &CurrentUser) -> Access {
    if user.is_admin() {
        Access::Allow
    } else {
        Access::Deny("Not authorized as admin")
    }
}

pub fn owner(user: &CurrentUser, owner_id: Uuid, reason: &'static str) -> Access {
    if user.id == owner_id {
        Access::Allow
    } else {
        Access::Deny(reason)
    }
}

pub fn owner_or_admin(user: &CurrentUser, owner_id: Uuid, reason: &'static str) -> Access {
    if user.id == owner_id || user.is_admin() {
        Access::Allow
    } else {
        Access::Deny(reason)
    }
}

/// Either party of a two-sided record, or an admin
pub fn party_or_admin(
    user: &CurrentUser,
    first: Uuid,
    second: Uuid,
    reason: &'static str,
) -> Access {
    if user.id == first || user.id == second || user.is_admin() {
        Access::Allow
    } else {
        Access::Deny(reason)
    }
}

/// Whether the user's role is linked to the named permission
pub async fn permission<C: ConnectionTrait>(
    db: &C,
    user: &CurrentUser,
    name: &str,
) -> AppResult<Access> {
    let Some(role_id) = user.role_id else {
        return Ok(Access::Deny("Not authorized"));
    };

    let Some(permission) = permission::Entity::find()
        .filter(permission::Column::Name.eq(name))
        .one(db)
        .await?
    else {
        return Ok(Access::Deny("Permission not found"));
    };

    let linked = permission_role::Entity::find()
        .filter(permission_role::Column::RoleId.eq(role_id))
        .filter(permission_role::Column::PermissionId.eq(permission.id))
        .one(db)
        .await?;

    Ok(match linked {
        Some(_) => Access::Allow,
        None => Access::Deny("Not authorized for this action"),
    })
}
