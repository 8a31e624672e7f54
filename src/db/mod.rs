pub mod seed;

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// In-memory SQLite lives inside a single connection, so the pool is pinned to one.
fn connect_options(config: &Config) -> ConnectOptions {
    let mut options = ConnectOptions::new(config.database_url.clone());
    let max = if config.database_url.contains(":memory:") { 1 } else { 10 };

    options
        .max_connections(max)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(!config.is_production() && config.app_env != "test");
    options
}

pub async fn connect(config: &Config) -> AppResult<DatabaseConnection> {
    let db = Database::connect(connect_options(config))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to connect to database: {}", e)))?;

    tracing::debug!(backend = ?db.get_database_backend(), "Database pool ready");
    Ok(db)
}
