pub use sea_orm_migration::prelude::*;

mod m20250601_000001_create_access_control;
mod m20250601_000002_create_users;
mod m20250601_000003_create_cars;
mod m20250601_000004_create_bookings;
mod m20250601_000005_create_feedback;
mod m20250601_000006_create_transactions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_access_control::Migration),
            Box::new(m20250601_000002_create_users::Migration),
            Box::new(m20250601_000003_create_cars::Migration),
            Box::new(m20250601_000004_create_bookings::Migration),
            Box::new(m20250601_000005_create_feedback::Migration),
            Box::new(m20250601_000006_create_transactions::Migration),
        ]
    }
}
