//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod account_repository;
pub mod invoice_repository;
pub mod repository_provider;
pub mod reservation_repository;
pub mod resource_repository;
pub mod session_repository;
pub mod subscription_repository;

pub use repository_provider::SeaOrmRepositoryProvider;

use rust_decimal::Decimal;
use sea_orm::{DbErr, SqlErr};

use crate::domain::DomainError;

/// Unique-index violations surface as `Conflict`, everything else as `Storage`.
pub(crate) fn db_err(e: DbErr) -> DomainError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => DomainError::Conflict(msg),
        _ => DomainError::Storage(e.to_string()),
    }
}

pub(crate) fn json_err(e: serde_json::Error) -> DomainError {
    DomainError::Storage(format!("Corrupt JSON column: {}", e))
}

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Decimal {
    raw.parse().unwrap_or_else(|_| {
        log::warn!("Unparseable decimal in {}: {:?}", column, raw);
        Decimal::ZERO
    })
}
