//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::Reservation;
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert a new reservation, returning it with its assigned id
    async fn insert(&self, reservation: Reservation) -> DomainResult<Reservation>;

    /// Find reservation by ID
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>>;

    /// Update an existing reservation
    async fn update(&self, reservation: Reservation) -> DomainResult<()>;

    /// All `ACTIVE` reservations on a charging point
    async fn find_active_for_point(&self, point_id: i32) -> DomainResult<Vec<Reservation>>;

    /// All `ACTIVE` reservations held by a driver
    async fn find_active_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Reservation>>;

    /// `ACTIVE` reservations whose `end_time < now`
    async fn find_expired(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>>;

    /// Every reservation of a driver, newest first
    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Reservation>>;
}
