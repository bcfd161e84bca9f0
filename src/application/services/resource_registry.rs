//! Resource availability state machine
//!
//! Every status write on a facility, station, point or charger goes through
//! [`ResourceRegistry`]. Writes are serialized by one registry-wide mutex so
//! that a station's `using` flag is always recomputed from a consistent view
//! of its points.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::{
    ChargingPoint, DomainError, DomainResult, RepositoryProvider, ResourceKind, ResourceRef,
    ResourceStatus, Station,
};

pub struct ResourceRegistry {
    repos: Arc<dyn RepositoryProvider>,
    cascade: Mutex<()>,
}

impl ResourceRegistry {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self {
            repos,
            cascade: Mutex::new(()),
        }
    }

    /// Current status of any resource.
    pub async fn status_of(&self, resource: ResourceRef) -> DomainResult<ResourceStatus> {
        let res = self.repos.resources();
        let status = match resource {
            ResourceRef::Facility(id) => res.find_facility(id).await?.map(|f| f.status),
            ResourceRef::Station(id) => res.find_station(id).await?.map(|s| s.status),
            ResourceRef::Point(id) => res.find_point(id).await?.map(|p| p.status),
            ResourceRef::Charger(id) => res.find_charger(id).await?.map(|c| c.status),
        };
        status.ok_or_else(|| DomainError::not_found(resource.entity_name(), resource.id()))
    }

    /// Administrative status change.
    ///
    /// `using` is only ever set by [`start_using`](Self::start_using) and
    /// [`engage_charger`](Self::engage_charger); a point becomes `booked`
    /// only through a reservation.
    pub async fn set_status(&self, resource: ResourceRef, status: ResourceStatus) -> DomainResult<()> {
        if !resource.kind().supports(status) {
            return Err(DomainError::InvalidInput(format!(
                "{} cannot be {}",
                resource.kind().as_str(),
                status
            )));
        }
        match (status, resource.kind()) {
            (ResourceStatus::Using, _) => {
                return Err(DomainError::InvalidTransition(format!(
                    "{} becomes using only when a session starts",
                    resource
                )))
            }
            (ResourceStatus::Booked, ResourceKind::Point) => {
                return Err(DomainError::InvalidTransition(format!(
                    "{} becomes booked only through a reservation",
                    resource
                )))
            }
            _ => {}
        }

        let _guard = self.cascade.lock().await;
        let current = self.status_of(resource).await?;
        if current == status {
            return Ok(());
        }
        if current == ResourceStatus::Using {
            return Err(DomainError::InvalidTransition(format!(
                "{} is in use",
                resource
            )));
        }
        if matches!(status, ResourceStatus::Inactive | ResourceStatus::Maintenance)
            && self.has_descendant_using(resource).await?
        {
            return Err(DomainError::InvalidTransition(format!(
                "{} has a descendant in use, cannot become {}",
                resource, status
            )));
        }

        self.repos.resources().update_status(resource, status).await?;
        info!(%resource, from = %current, to = %status, "Resource status changed");
        Ok(())
    }

    /// Mark a point (and its station) as carrying a running session.
    pub async fn start_using(&self, point_id: i32) -> DomainResult<()> {
        let _guard = self.cascade.lock().await;

        let point = self.point(point_id).await?;
        if !point.accepts_session() {
            return Err(DomainError::ResourceUnavailable(format!(
                "point {} is {}",
                point_id, point.status
            )));
        }
        let station = self.station(point.station_id).await?;
        if station.deleted || !matches!(station.status, ResourceStatus::Active | ResourceStatus::Using) {
            return Err(DomainError::ResourceUnavailable(format!(
                "station {} is {}",
                station.id, station.status
            )));
        }
        let facility = self
            .repos
            .resources()
            .find_facility(station.facility_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Facility", station.facility_id))?;
        if facility.deleted || facility.status != ResourceStatus::Active {
            return Err(DomainError::ResourceUnavailable(format!(
                "facility {} is {}",
                facility.id, facility.status
            )));
        }

        let res = self.repos.resources();
        res.update_status(ResourceRef::Point(point_id), ResourceStatus::Using).await?;
        if station.status != ResourceStatus::Using {
            res.update_status(ResourceRef::Station(station.id), ResourceStatus::Using).await?;
        }
        debug!(point_id, station_id = station.id, "Point in use");
        Ok(())
    }

    /// Release a point after its session ended.
    ///
    /// Engaged chargers go back to `active` and the station is recomputed:
    /// `using` iff any sibling point is still `using`.
    pub async fn stop_using(&self, point_id: i32) -> DomainResult<()> {
        let _guard = self.cascade.lock().await;

        let point = self.point(point_id).await?;
        if !point.is_using() {
            return Err(DomainError::InvalidTransition(format!(
                "point {} is {}, not using",
                point_id, point.status
            )));
        }

        let res = self.repos.resources();
        for charger in res.chargers_of_point(point_id).await? {
            if charger.status == ResourceStatus::Using {
                res.update_status(ResourceRef::Charger(charger.id), ResourceStatus::Active)
                    .await?;
            }
        }
        res.update_status(ResourceRef::Point(point_id), ResourceStatus::Active).await?;

        let station = self.station(point.station_id).await?;
        let still_using = res
            .points_of_station(station.id)
            .await?
            .iter()
            .any(|p| p.is_using());
        let next = if still_using {
            ResourceStatus::Using
        } else {
            ResourceStatus::Active
        };
        if station.status != next {
            res.update_status(ResourceRef::Station(station.id), next).await?;
        }
        debug!(point_id, station_id = station.id, station_status = %next, "Point released");
        Ok(())
    }

    /// Hold an `active` point for a reservation.
    pub async fn hold(&self, point_id: i32) -> DomainResult<()> {
        let _guard = self.cascade.lock().await;
        let point = self.point(point_id).await?;
        if point.deleted || point.status != ResourceStatus::Active {
            return Err(DomainError::ResourceUnavailable(format!(
                "point {} is {}",
                point_id, point.status
            )));
        }
        self.repos
            .resources()
            .update_status(ResourceRef::Point(point_id), ResourceStatus::Booked)
            .await
    }

    /// Drop a reservation hold. No-op unless the point is still `booked`.
    pub async fn release_hold(&self, point_id: i32) -> DomainResult<()> {
        let _guard = self.cascade.lock().await;
        let point = self.point(point_id).await?;
        if point.status == ResourceStatus::Booked {
            self.repos
                .resources()
                .update_status(ResourceRef::Point(point_id), ResourceStatus::Active)
                .await?;
        }
        Ok(())
    }

    /// Mark a charger as delivering energy for the session on its point.
    pub async fn engage_charger(&self, charger_id: i32) -> DomainResult<()> {
        let _guard = self.cascade.lock().await;
        let res = self.repos.resources();
        let charger = res
            .find_charger(charger_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Charger", charger_id))?;
        if charger.deleted || charger.status != ResourceStatus::Active {
            return Err(DomainError::ResourceUnavailable(format!(
                "charger {} is {}",
                charger_id, charger.status
            )));
        }
        let point = self.point(charger.point_id).await?;
        if !point.is_using() {
            return Err(DomainError::ResourceUnavailable(format!(
                "point {} has no running session",
                point.id
            )));
        }
        res.update_status(ResourceRef::Charger(charger_id), ResourceStatus::Using).await
    }

    /// Soft-delete a resource. Rows stay for historical sessions.
    pub async fn retire(&self, resource: ResourceRef) -> DomainResult<()> {
        let _guard = self.cascade.lock().await;
        let current = self.status_of(resource).await?;
        if current == ResourceStatus::Using || self.has_descendant_using(resource).await? {
            return Err(DomainError::InvalidTransition(format!(
                "{} is in use and cannot be retired",
                resource
            )));
        }
        self.repos.resources().mark_deleted(resource).await?;
        info!(%resource, "Resource retired");
        Ok(())
    }

    async fn point(&self, id: i32) -> DomainResult<ChargingPoint> {
        self.repos
            .resources()
            .find_point(id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingPoint", id))
    }

    async fn station(&self, id: i32) -> DomainResult<Station> {
        self.repos
            .resources()
            .find_station(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Station", id))
    }

    async fn has_descendant_using(&self, resource: ResourceRef) -> DomainResult<bool> {
        let res = self.repos.resources();
        let points = match resource {
            ResourceRef::Charger(_) => return Ok(false),
            ResourceRef::Point(id) => vec![self.point(id).await?],
            ResourceRef::Station(id) => res.points_of_station(id).await?,
            ResourceRef::Facility(id) => {
                let mut points = Vec::new();
                for station in res.stations_of_facility(id).await? {
                    if station.status == ResourceStatus::Using {
                        return Ok(true);
                    }
                    points.extend(res.points_of_station(station.id).await?);
                }
                points
            }
        };

        for point in points {
            if point.is_using() && !matches!(resource, ResourceRef::Point(_)) {
                return Ok(true);
            }
            let chargers = res.chargers_of_point(point.id).await?;
            if chargers.iter().any(|c| c.status == ResourceStatus::Using) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::fixtures::Fixture;

    #[tokio::test]
    async fn start_using_cascades_to_station() {
        let fx = Fixture::new().await;
        let registry = &fx.services.registry;

        registry.start_using(1).await.unwrap();
        assert_eq!(registry.status_of(ResourceRef::Point(1)).await.unwrap(), ResourceStatus::Using);
        assert_eq!(registry.status_of(ResourceRef::Station(1)).await.unwrap(), ResourceStatus::Using);

        registry.start_using(2).await.unwrap();
        registry.stop_using(1).await.unwrap();
        assert_eq!(registry.status_of(ResourceRef::Station(1)).await.unwrap(), ResourceStatus::Using);

        registry.stop_using(2).await.unwrap();
        assert_eq!(registry.status_of(ResourceRef::Point(2)).await.unwrap(), ResourceStatus::Active);
        assert_eq!(registry.status_of(ResourceRef::Station(1)).await.unwrap(), ResourceStatus::Active);
    }

    #[tokio::test]
    async fn stop_using_requires_using_point() {
        let fx = Fixture::new().await;
        let err = fx.services.registry.stop_using(1).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn start_using_rejects_unavailable_resources() {
        let fx = Fixture::new().await;
        let registry = &fx.services.registry;

        registry
            .set_status(ResourceRef::Point(1), ResourceStatus::Maintenance)
            .await
            .unwrap();
        assert!(matches!(
            registry.start_using(1).await,
            Err(DomainError::ResourceUnavailable(_))
        ));

        registry
            .set_status(ResourceRef::Station(1), ResourceStatus::Inactive)
            .await
            .unwrap();
        assert!(matches!(
            registry.start_using(2).await,
            Err(DomainError::ResourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn inactive_refused_while_descendant_using() {
        let fx = Fixture::new().await;
        let registry = &fx.services.registry;

        registry.start_using(1).await.unwrap();
        registry.engage_charger(1).await.unwrap();

        for target in [ResourceRef::Facility(1), ResourceRef::Station(1), ResourceRef::Point(1)] {
            let err = registry.set_status(target, ResourceStatus::Inactive).await.unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition(_)), "{target}");
        }
        // The sibling point has nothing running.
        registry
            .set_status(ResourceRef::Point(2), ResourceStatus::Inactive)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn point_with_using_charger_cannot_go_inactive() {
        let fx = Fixture::new().await;
        let registry = &fx.services.registry;
        let res = fx.repos.resources();

        // Charger left engaged on a point that is no longer using.
        res.update_status(ResourceRef::Charger(2), ResourceStatus::Using).await.unwrap();
        let err = registry
            .set_status(ResourceRef::Point(2), ResourceStatus::Inactive)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn stop_using_releases_engaged_chargers() {
        let fx = Fixture::new().await;
        let registry = &fx.services.registry;

        registry.start_using(1).await.unwrap();
        registry.engage_charger(1).await.unwrap();
        assert_eq!(registry.status_of(ResourceRef::Charger(1)).await.unwrap(), ResourceStatus::Using);

        registry.stop_using(1).await.unwrap();
        assert_eq!(registry.status_of(ResourceRef::Charger(1)).await.unwrap(), ResourceStatus::Active);
    }

    #[tokio::test]
    async fn charger_engagement_needs_running_session() {
        let fx = Fixture::new().await;
        let err = fx.services.registry.engage_charger(1).await.unwrap_err();
        assert!(matches!(err, DomainError::ResourceUnavailable(_)));
    }

    #[tokio::test]
    async fn admin_cannot_set_using_or_book_points() {
        let fx = Fixture::new().await;
        let registry = &fx.services.registry;

        assert!(matches!(
            registry.set_status(ResourceRef::Point(1), ResourceStatus::Using).await,
            Err(DomainError::InvalidTransition(_))
        ));
        assert!(matches!(
            registry.set_status(ResourceRef::Point(1), ResourceStatus::Booked).await,
            Err(DomainError::InvalidTransition(_))
        ));
        assert!(matches!(
            registry.set_status(ResourceRef::Station(1), ResourceStatus::Maintenance).await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn hold_and_release() {
        let fx = Fixture::new().await;
        let registry = &fx.services.registry;

        registry.hold(1).await.unwrap();
        assert_eq!(registry.status_of(ResourceRef::Point(1)).await.unwrap(), ResourceStatus::Booked);
        assert!(matches!(registry.hold(1).await, Err(DomainError::ResourceUnavailable(_))));

        registry.release_hold(1).await.unwrap();
        assert_eq!(registry.status_of(ResourceRef::Point(1)).await.unwrap(), ResourceStatus::Active);
        registry.release_hold(1).await.unwrap();
    }

    #[tokio::test]
    async fn retired_point_no_longer_accepts_sessions() {
        let fx = Fixture::new().await;
        let registry = &fx.services.registry;

        registry.retire(ResourceRef::Point(2)).await.unwrap();
        assert!(matches!(
            registry.start_using(2).await,
            Err(DomainError::ResourceUnavailable(_))
        ));

        registry.start_using(1).await.unwrap();
        assert!(matches!(
            registry.retire(ResourceRef::Station(1)).await,
            Err(DomainError::InvalidTransition(_))
        ));
    }
}
