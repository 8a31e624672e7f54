use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

pub type PanicLayer = CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response>;

/// Turn a panicking handler into a JSON 500, hiding the panic text in production
pub fn catch_panic_layer(production: bool) -> PanicLayer {
    if production {
        CatchPanicLayer::custom(panic_to_json_redacted as fn(_) -> _)
    } else {
        CatchPanicLayer::custom(panic_to_json_detailed as fn(_) -> _)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic"
    }
}

fn panic_to_json_detailed(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic_message(panic.as_ref());
    tracing::error!(panic = %details, "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": format!("Internal server error: {}", details) })),
    )
        .into_response()
}

fn panic_to_json_redacted(panic: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!(panic = %panic_message(panic.as_ref()), "handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal server error" })),
    )
        .into_response()
}
