use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::config::Config;

/// Per-IP limiter wrapped around the whole API
pub type GlobalGovernorLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Build the per-IP limiter from `RATE_LIMIT_PER_MINUTE` and `RATE_LIMIT_BURST`.
/// Needs the peer address, so the server is started with connect info.
pub fn create_global_governor(config: &Config) -> GlobalGovernorLayer {
    let governor = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(config.rate_limit_period_ms())
            .burst_size(config.rate_limit_burst.max(1))
            .finish()
            .expect("rate limit period and burst must be non-zero"),
    );

    tracing::info!(
        per_minute = config.rate_limit_per_minute,
        burst = config.rate_limit_burst,
        "Rate limiter configured"
    );

    GovernorLayer::new(governor)
}

/// Access log keyed by client IP
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match status {
        StatusCode::TOO_MANY_REQUESTS => tracing::warn!(
            client_ip = %addr.ip(),
            %method,
            %path,
            "Rental API rate limit hit"
        ),
        s if s.is_server_error() => tracing::error!(
            client_ip = %addr.ip(),
            %method,
            %path,
            status = %s,
            elapsed_ms,
            "Rental API request errored"
        ),
        s if s.is_client_error() => tracing::warn!(
            client_ip = %addr.ip(),
            %method,
            %path,
            status = %s,
            elapsed_ms,
            "Rental API request rejected"
        ),
        s => tracing::debug!(
            client_ip = %addr.ip(),
            %method,
            %path,
            status = %s,
            elapsed_ms,
            "Rental API request served"
        ),
    }

    response
}
