pub mod auth;
pub mod panic;
pub mod rate_limit;
