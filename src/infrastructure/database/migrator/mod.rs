//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_resources;
mod m20250101_000002_create_reservations;
mod m20250101_000003_create_subscriptions;
mod m20250101_000004_create_charging_sessions;
mod m20250101_000005_create_invoices;
mod m20250101_000006_create_driver_accounts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_resources::Migration),
            Box::new(m20250101_000002_create_reservations::Migration),
            Box::new(m20250101_000003_create_subscriptions::Migration),
            Box::new(m20250101_000004_create_charging_sessions::Migration),
            Box::new(m20250101_000005_create_invoices::Migration),
            Box::new(m20250101_000006_create_driver_accounts::Migration),
        ]
    }
}
