use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
    Extension,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::entities::{role, user};
use crate::error::{AppError, AppResult};
use crate::policy;
use crate::utils::jwt::verify_token;
use crate::AppState;

/// The authenticated principal, resolved once per request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role_id: Option<Uuid>,
    pub role: Option<String>,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(role::ADMIN)
    }
}

/// Principal for routes where authentication is optional
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<CurrentUser>);

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
}

async fn resolve_user(state: &AppState, token: &str) -> AppResult<CurrentUser> {
    let claims = verify_token(token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Not authorized, token failed".to_string()))?;

    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Not authorized, user not found".to_string()))?;

    let role = match user.role_id {
        Some(role_id) => role::Entity::find_by_id(role_id)
            .one(&state.db)
            .await?
            .filter(|r| r.active),
        None => None,
    };

    Ok(CurrentUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role_id: role.as_ref().map(|r| r.id),
        role: role.map(|r| r.name),
    })
}

/// Extract and validate the bearer token, attaching the user to the request
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

    let current = resolve_user(&state, &token).await?;
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Resolve the user when a valid token is present, never reject
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let viewer = match bearer_token(request.headers()) {
        Some(token) => match resolve_user(&state, &token).await {
            Ok(current) => Some(current),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring invalid optional credential");
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(Viewer(viewer));
    next.run(request).await
}

/// Require admin role
pub async fn require_admin(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    policy::admin(current).check()?;

    Ok(next.run(request).await)
}

/// State for [`require_permission`]: which permission the wrapped route needs
#[derive(Clone)]
pub struct PermissionGate {
    pub state: AppState,
    pub permission: &'static str,
}

impl PermissionGate {
    pub fn new(state: &AppState, permission: &'static str) -> Self {
        Self {
            state: state.clone(),
            permission,
        }
    }
}

/// Require that the user's role holds `gate.permission`
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    Extension(current): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    policy::permission(&gate.state.db, &current, gate.permission)
        .await?
        .check()?;

    Ok(next.run(request).await)
}
