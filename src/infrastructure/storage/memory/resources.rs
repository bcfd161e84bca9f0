//! Resource hierarchy held in DashMaps

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{
    Charger, ChargingPoint, DomainError, DomainResult, Facility, ResourceRef, ResourceRepository,
    ResourceStatus, Station,
};

#[derive(Default)]
pub struct InMemoryResourceRepository {
    facilities: DashMap<i32, Facility>,
    stations: DashMap<i32, Station>,
    points: DashMap<i32, ChargingPoint>,
    chargers: DashMap<i32, Charger>,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(resource: ResourceRef) -> DomainError {
    DomainError::not_found(resource.entity_name(), resource.id())
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn save_facility(&self, facility: Facility) -> DomainResult<()> {
        self.facilities.insert(facility.id, facility);
        Ok(())
    }

    async fn find_facility(&self, id: i32) -> DomainResult<Option<Facility>> {
        Ok(self.facilities.get(&id).map(|f| f.clone()))
    }

    async fn save_station(&self, station: Station) -> DomainResult<()> {
        self.stations.insert(station.id, station);
        Ok(())
    }

    async fn find_station(&self, id: i32) -> DomainResult<Option<Station>> {
        Ok(self.stations.get(&id).map(|s| s.clone()))
    }

    async fn stations_of_facility(&self, facility_id: i32) -> DomainResult<Vec<Station>> {
        let mut stations: Vec<Station> = self
            .stations
            .iter()
            .filter(|s| s.facility_id == facility_id)
            .map(|s| s.value().clone())
            .collect();
        stations.sort_by_key(|s| s.id);
        Ok(stations)
    }

    async fn save_point(&self, point: ChargingPoint) -> DomainResult<()> {
        self.points.insert(point.id, point);
        Ok(())
    }

    async fn find_point(&self, id: i32) -> DomainResult<Option<ChargingPoint>> {
        Ok(self.points.get(&id).map(|p| p.clone()))
    }

    async fn points_of_station(&self, station_id: i32) -> DomainResult<Vec<ChargingPoint>> {
        let mut points: Vec<ChargingPoint> = self
            .points
            .iter()
            .filter(|p| p.station_id == station_id)
            .map(|p| p.value().clone())
            .collect();
        points.sort_by_key(|p| p.id);
        Ok(points)
    }

    async fn save_charger(&self, charger: Charger) -> DomainResult<()> {
        self.chargers.insert(charger.id, charger);
        Ok(())
    }

    async fn find_charger(&self, id: i32) -> DomainResult<Option<Charger>> {
        Ok(self.chargers.get(&id).map(|c| c.clone()))
    }

    async fn chargers_of_point(&self, point_id: i32) -> DomainResult<Vec<Charger>> {
        let mut chargers: Vec<Charger> = self
            .chargers
            .iter()
            .filter(|c| c.point_id == point_id)
            .map(|c| c.value().clone())
            .collect();
        chargers.sort_by_key(|c| c.id);
        Ok(chargers)
    }

    async fn update_status(&self, resource: ResourceRef, status: ResourceStatus) -> DomainResult<()> {
        let updated = match resource {
            ResourceRef::Facility(id) => self.facilities.get_mut(&id).map(|mut f| f.status = status),
            ResourceRef::Station(id) => self.stations.get_mut(&id).map(|mut s| s.status = status),
            ResourceRef::Point(id) => self.points.get_mut(&id).map(|mut p| p.status = status),
            ResourceRef::Charger(id) => self.chargers.get_mut(&id).map(|mut c| c.status = status),
        };
        updated.ok_or_else(|| missing(resource))
    }

    async fn mark_deleted(&self, resource: ResourceRef) -> DomainResult<()> {
        let updated = match resource {
            ResourceRef::Facility(id) => self.facilities.get_mut(&id).map(|mut f| f.deleted = true),
            ResourceRef::Station(id) => self.stations.get_mut(&id).map(|mut s| s.deleted = true),
            ResourceRef::Point(id) => self.points.get_mut(&id).map(|mut p| p.deleted = true),
            ResourceRef::Charger(id) => self.chargers.get_mut(&id).map(|mut c| c.deleted = true),
        };
        updated.ok_or_else(|| missing(resource))
    }
}
