//! Resource repository interface

use async_trait::async_trait;

use super::model::{Charger, ChargingPoint, Facility, ResourceRef, ResourceStatus, Station};
use crate::domain::DomainResult;

/// Storage for the resource hierarchy.
///
/// `save_*` are provisioning upserts; runtime status changes go through
/// [`update_status`](ResourceRepository::update_status), which only the
/// resource registry calls.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn save_facility(&self, facility: Facility) -> DomainResult<()>;
    async fn find_facility(&self, id: i32) -> DomainResult<Option<Facility>>;

    async fn save_station(&self, station: Station) -> DomainResult<()>;
    async fn find_station(&self, id: i32) -> DomainResult<Option<Station>>;
    async fn stations_of_facility(&self, facility_id: i32) -> DomainResult<Vec<Station>>;

    async fn save_point(&self, point: ChargingPoint) -> DomainResult<()>;
    async fn find_point(&self, id: i32) -> DomainResult<Option<ChargingPoint>>;
    async fn points_of_station(&self, station_id: i32) -> DomainResult<Vec<ChargingPoint>>;

    async fn save_charger(&self, charger: Charger) -> DomainResult<()>;
    async fn find_charger(&self, id: i32) -> DomainResult<Option<Charger>>;
    async fn chargers_of_point(&self, point_id: i32) -> DomainResult<Vec<Charger>>;

    /// Overwrite the status of one resource. Fails with `NotFound` for unknown ids.
    async fn update_status(&self, resource: ResourceRef, status: ResourceStatus) -> DomainResult<()>;

    /// Set the soft-delete flag of one resource.
    async fn mark_deleted(&self, resource: ResourceRef) -> DomainResult<()>;
}
