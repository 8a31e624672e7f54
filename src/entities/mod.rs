pub mod booking;
pub mod car;
pub mod car_document;
pub mod car_image;
pub mod feedback;
pub mod permission;
pub mod permission_role;
pub mod role;
pub mod transaction;
pub mod user;

use sea_orm::prelude::DateTimeWithTimeZone;

/// Current time as stored in `timestamptz` columns
pub fn now() -> DateTimeWithTimeZone {
    chrono::Utc::now().fixed_offset()
}
