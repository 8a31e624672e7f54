use axum::{
    middleware,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};

use crate::error::AppError;
use crate::handlers::{bookings, cars, feedbacks, transactions, users};
use crate::middleware::auth::{
    auth_middleware, optional_auth_middleware, require_admin, require_permission, PermissionGate,
};
use crate::AppState;

/// Wrap a single route so it also needs the named permission
fn gated(
    state: &AppState,
    permission: &'static str,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(
        PermissionGate::new(state, permission),
        require_permission,
    ))
}

fn user_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", post(users::register))
        .route("/login", post(users::login))
        .route("/refresh-token", post(users::refresh_access_token));

    let authenticated = Router::new()
        .route("/logout", post(users::logout))
        .route("/profile", get(users::get_profile).put(users::update_profile))
        .route("/change-password", put(users::change_password))
        .route("/deleteaccount", delete(users::delete_account))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/", get(users::list_users))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    public.merge(authenticated).merge(admin)
}

fn car_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(cars::list_approved_cars))
        .route("/feedback/{car_id}", get(cars::car_feedback));

    // Unapproved cars are visible to their owner and admins
    let viewer = Router::new()
        .route("/{id}", get(cars::get_car))
        .route("/owner/{user_id}", get(cars::cars_by_owner))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth_middleware));

    let authenticated = Router::new()
        .route("/", gated(state, "create_car", post(cars::create_car)))
        .route("/{id}", gated(state, "update_car", put(cars::update_car)))
        .route("/{id}/status", put(cars::update_car_status))
        .route("/{id}/images", post(cars::add_car_images))
        .route("/{id}/documents", post(cars::add_car_documents))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/admin", get(cars::list_all_cars))
        .route("/{id}", delete(cars::delete_car))
        .route("/{id}/approve", put(cars::update_car_approval))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    public.merge(viewer).merge(authenticated).merge(admin)
}

fn booking_routes(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route("/", gated(state, "create_booking", post(bookings::create_booking)))
        .route("/mybookings", get(bookings::my_bookings))
        .route("/{id}", get(bookings::get_booking))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/", get(bookings::list_bookings))
        .route("/{id}", delete(bookings::delete_booking))
        .route("/{id}/status", put(bookings::update_booking_status))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    authenticated.merge(admin)
}

fn feedback_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/", get(feedbacks::list_feedbacks))
        .route("/car/{car_id}", get(feedbacks::feedbacks_by_car))
        .route("/{id}", get(feedbacks::get_feedback));

    let authenticated = Router::new()
        .route("/", gated(state, "create_feedback", post(feedbacks::create_feedback)))
        .route("/{id}", put(feedbacks::update_feedback))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/{id}", delete(feedbacks::delete_feedback))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    public.merge(authenticated).merge(admin)
}

fn transaction_routes(state: &AppState) -> Router<AppState> {
    let authenticated = Router::new()
        .route(
            "/",
            gated(state, "create_transaction", post(transactions::create_transaction)),
        )
        .route("/mytransactions", get(transactions::my_transactions))
        .route("/{id}", get(transactions::get_transaction))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route("/", get(transactions::list_transactions))
        .route("/{id}/status", put(transactions::update_transaction_status))
        .route("/{id}/refund", post(transactions::create_refund))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    authenticated.merge(admin)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", user_routes(&state))
        .nest("/cars", car_routes(&state))
        .nest("/bookings", booking_routes(&state))
        .nest("/feedbacks", feedback_routes(&state))
        .nest("/transactions", transaction_routes(&state));

    Router::new()
        .nest("/api", api)
        .fallback(route_not_found)
        .with_state(state)
}
