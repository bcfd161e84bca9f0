//! Charging session repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::ChargingSession;
use crate::domain::DomainResult;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert a new session, returning it with its assigned id.
    ///
    /// Backends that enforce the one-charging-session rules at the storage
    /// level report a violation as `Conflict`.
    async fn insert(&self, session: ChargingSession) -> DomainResult<ChargingSession>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingSession>>;

    async fn update(&self, session: ChargingSession) -> DomainResult<()>;

    async fn find_charging_for_point(&self, point_id: i32) -> DomainResult<Option<ChargingSession>>;

    async fn find_charging_for_driver(&self, driver_id: i32) -> DomainResult<Option<ChargingSession>>;

    async fn find_charging_for_vehicle(&self, vehicle_id: i32) -> DomainResult<Option<ChargingSession>>;

    /// Every session of a driver, newest first
    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<ChargingSession>>;

    /// `COMPLETED` driver sessions ended in `[start, end)` with no invoice
    async fn find_unbilled_for_driver(
        &self,
        driver_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>>;

    /// `COMPLETED` enterprise sessions ended in `[start, end)` with no enterprise invoice
    async fn find_unbilled_for_enterprise(
        &self,
        enterprise_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>>;

    /// Enterprises owning at least one unbilled completed session in `[start, end)`
    async fn enterprises_with_unbilled(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<i32>>;
}
