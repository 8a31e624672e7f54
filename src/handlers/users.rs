use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::{car, now, role, user};
use crate::error::{AppError, AppResult};
use crate::handlers::{AppJson, AppPath, AppQuery, MessageResponse};
use crate::middleware::auth::CurrentUser;
use crate::utils::jwt::{create_token, verify_token};
use crate::utils::password::{hash_password, verify_password};
use crate::workflow;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub phone_no: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub driving_license: Option<String>,
    pub national_id_no: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RoleInfo {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

impl From<&role::Model> for RoleInfo {
    fn from(r: &role::Model) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            description: r.description.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: user::Model,
    pub role: Option<RoleInfo>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserDetailResponse {
    #[serde(flatten)]
    pub profile: UserResponse,
    pub cars: Vec<car::Model>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total_users: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

async fn with_role<C: ConnectionTrait>(db: &C, user: user::Model) -> AppResult<UserResponse> {
    let role = match user.role_id {
        Some(role_id) => role::Entity::find_by_id(role_id).one(db).await?,
        None => None,
    };
    Ok(UserResponse {
        role: role.as_ref().map(RoleInfo::from),
        user,
    })
}

fn access_token(config: &Config, user: &user::Model) -> AppResult<String> {
    create_token(user.id, &user.email, &config.jwt_secret, config.access_token_lifetime())
}

fn refresh_token(config: &Config, user_id: Uuid, email: &str) -> AppResult<String> {
    create_token(
        user_id,
        email,
        &config.refresh_token_secret,
        config.refresh_token_lifetime(),
    )
}

async fn find_user<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<user::Model> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Reject `email` if another account already uses it
async fn ensure_email_free<C: ConnectionTrait>(db: &C, email: &str, owner: Uuid) -> AppResult<()> {
    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .filter(user::Column::Id.ne(owner))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(AppError::BadRequest("Email already in use".to_string()));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Register a new account with the default `user` role
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide name, email and password".to_string(),
        ));
    }

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let default_role = role::Entity::find()
        .filter(role::Column::Name.eq(role::USER))
        .one(&state.db)
        .await?;

    let user_id = Uuid::new_v4();
    let refresh = refresh_token(&state.config, user_id, &email)?;

    let created = user::ActiveModel {
        id: Set(user_id),
        name: Set(name.to_string()),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        wallet: Set(0.0),
        refresh_token: Set(Some(refresh.clone())),
        role_id: Set(default_role.map(|r| r.id)),
        created_at: Set(now()),
        updated_at: Set(now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(user_id = %created.id, "User registered");

    let token = access_token(&state.config, &created)?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: with_role(&state.db, created).await?,
            token,
            refresh_token: refresh,
        }),
    ))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let email = payload.email.trim().to_lowercase();
    let found = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &found.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }

    let token = access_token(&state.config, &found)?;
    let refresh = refresh_token(&state.config, found.id, &found.email)?;

    let mut active: user::ActiveModel = found.into();
    active.refresh_token = Set(Some(refresh.clone()));
    let updated = active.update(&state.db).await?;

    Ok(Json(AuthResponse {
        user: with_role(&state.db, updated).await?,
        token,
        refresh_token: refresh,
    }))
}

/// Exchange the stored refresh token for a new access token
pub async fn refresh_access_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let presented = non_empty(payload.refresh_token)
        .ok_or_else(|| AppError::Unauthorized("Refresh token is required".to_string()))?;

    let claims = verify_token(&presented, &state.config.refresh_token_secret)
        .map_err(|_| AppError::Forbidden("Invalid refresh token".to_string()))?;

    let found = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .filter(|u| u.refresh_token.as_deref() == Some(presented.as_str()))
        .ok_or_else(|| AppError::Forbidden("Invalid refresh token".to_string()))?;

    Ok(Json(TokenResponse {
        token: access_token(&state.config, &found)?,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<MessageResponse>> {
    let found = find_user(&state.db, current.id).await?;
    let mut active: user::ActiveModel = found.into();
    active.refresh_token = Set(None);
    active.update(&state.db).await?;

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<UserResponse>> {
    let found = find_user(&state.db, current.id).await?;
    Ok(Json(with_role(&state.db, found).await?))
}

/// Update own profile; blank fields are ignored. Returns a fresh access token.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let found = find_user(&state.db, current.id).await?;
    let mut active: user::ActiveModel = found.into();

    if let Some(email) = non_empty(payload.email).map(|e| e.to_lowercase()) {
        ensure_email_free(&state.db, &email, current.id).await?;
        active.email = Set(email);
    }
    if let Some(name) = non_empty(payload.name) {
        active.name = Set(name);
    }
    if let Some(address) = non_empty(payload.address) {
        active.address = Set(Some(address));
    }
    if let Some(phone_no) = non_empty(payload.phone_no) {
        active.phone_no = Set(Some(phone_no));
    }
    if let Some(date_of_birth) = payload.date_of_birth {
        active.date_of_birth = Set(Some(date_of_birth));
    }
    if let Some(driving_license) = non_empty(payload.driving_license) {
        active.driving_license = Set(Some(driving_license));
    }
    if let Some(national_id_no) = non_empty(payload.national_id_no) {
        active.national_id_no = Set(Some(national_id_no));
    }
    active.updated_at = Set(now());

    let updated = active.update(&state.db).await?;
    let token = access_token(&state.config, &updated)?;

    Ok(Json(ProfileResponse {
        profile: with_role(&state.db, updated).await?,
        token,
    }))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let (Some(current_password), Some(new_password)) = (
        payload.current_password.filter(|p| !p.is_empty()),
        payload.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "Please provide current and new password".to_string(),
        ));
    };

    let found = find_user(&state.db, current.id).await?;
    if !verify_password(&current_password, &found.password_hash)? {
        return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
    }

    let mut active: user::ActiveModel = found.into();
    active.password_hash = Set(hash_password(&new_password)?);
    active.updated_at = Set(now());
    active.update(&state.db).await?;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

/// List users (admin). Without `limit` everything comes back as one page.
pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<UserListResponse>> {
    let query = user::Entity::find().order_by_desc(user::Column::CreatedAt);
    let page = pagination.page.unwrap_or(1).max(1);

    let (users, total_users, current_page, total_pages) = match pagination.limit.filter(|l| *l > 0) {
        Some(limit) => {
            let paginator = query.paginate(&state.db, limit);
            let total = paginator.num_items().await?;
            let users = paginator.fetch_page(page - 1).await?;
            (users, total, page, total.div_ceil(limit))
        }
        None => {
            let users = query.all(&state.db).await?;
            let total = users.len() as u64;
            (users, total, 1, 1)
        }
    };

    let roles = role::Entity::find().all(&state.db).await?;
    let users = users
        .into_iter()
        .map(|u| {
            let role = u
                .role_id
                .and_then(|rid| roles.iter().find(|r| r.id == rid))
                .map(RoleInfo::from);
            UserResponse { user: u, role }
        })
        .collect();

    Ok(Json(UserListResponse {
        users,
        total_users,
        current_page,
        total_pages,
    }))
}

/// A user's profile together with the cars they listed (admin)
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<UserDetailResponse>> {
    let found = find_user(&state.db, id).await?;
    let cars = car::Entity::find()
        .filter(car::Column::UserId.eq(id))
        .order_by_desc(car::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(UserDetailResponse {
        profile: with_role(&state.db, found).await?,
        cars,
    }))
}

/// Update name, email or role of any user (admin)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<AdminUpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let found = find_user(&state.db, id).await?;

    if let Some(role_id) = payload.role_id {
        if found.id == current.id && found.role_id != Some(role_id) {
            return Err(AppError::Forbidden(
                "Admins cannot change their own role".to_string(),
            ));
        }
        if role::Entity::find_by_id(role_id).one(&state.db).await?.is_none() {
            return Err(AppError::BadRequest("Invalid role".to_string()));
        }
    }

    let mut active: user::ActiveModel = found.into();
    if let Some(email) = non_empty(payload.email).map(|e| e.to_lowercase()) {
        ensure_email_free(&state.db, &email, id).await?;
        active.email = Set(email);
    }
    if let Some(name) = non_empty(payload.name) {
        active.name = Set(name);
    }
    if let Some(role_id) = payload.role_id {
        active.role_id = Set(Some(role_id));
    }
    active.updated_at = Set(now());

    let updated = active.update(&state.db).await?;
    Ok(Json(with_role(&state.db, updated).await?))
}

/// Delete a user after handing back the cars their open bookings hold
async fn remove_user(db: &DatabaseConnection, user_id: Uuid) -> AppResult<()> {
    let txn = db.begin().await?;
    let released = workflow::release_user_bookings(&txn, user_id).await?;
    user::Entity::delete_by_id(user_id).exec(&txn).await?;
    txn.commit().await?;

    if released > 0 {
        tracing::info!(user_id = %user_id, released, "Open bookings closed with the account");
    }
    Ok(())
}

/// Delete any user except oneself (admin)
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let found = find_user(&state.db, id).await?;
    if found.id == current.id {
        return Err(AppError::Forbidden(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    remove_user(&state.db, found.id).await?;
    tracing::info!(user_id = %id, deleted_by = %current.id, "User deleted");

    Ok(Json(MessageResponse::new("User removed")))
}

/// Close one's own account; admin accounts cannot be closed this way
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<MessageResponse>> {
    if current.is_admin() {
        return Err(AppError::Forbidden(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    let found = find_user(&state.db, current.id).await?;
    remove_user(&state.db, found.id).await?;
    tracing::info!(user_id = %current.id, "Account closed");

    Ok(Json(MessageResponse::new("Account deleted successfully")))
}
