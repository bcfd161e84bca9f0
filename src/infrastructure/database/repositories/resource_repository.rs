//! SeaORM implementation of ResourceRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};

use super::db_err;
use crate::domain::resource::{
    Charger, ChargingPoint, Facility, ResourceRef, ResourceRepository, ResourceStatus, Station,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{charger, charging_point, facility, station};

pub struct SeaOrmResourceRepository {
    db: DatabaseConnection,
}

impl SeaOrmResourceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// `UPDATE <table> SET <column> = <value> WHERE id = <id>`, returning rows touched.
    async fn set_column<E: EntityTrait>(
        &self,
        id_column: E::Column,
        id: i32,
        column: E::Column,
        value: sea_orm::Value,
    ) -> DomainResult<u64> {
        let result = E::update_many()
            .col_expr(column, Expr::value(value))
            .filter(id_column.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn set_for(
        &self,
        resource: ResourceRef,
        pick: impl Fn(ResourceRef) -> ColumnPick,
        value: sea_orm::Value,
    ) -> DomainResult<()> {
        let id = resource.id();
        let touched = match pick(resource) {
            ColumnPick::Facility(col) => {
                self.set_column::<facility::Entity>(facility::Column::Id, id, col, value)
                    .await?
            }
            ColumnPick::Station(col) => {
                self.set_column::<station::Entity>(station::Column::Id, id, col, value)
                    .await?
            }
            ColumnPick::Point(col) => {
                self.set_column::<charging_point::Entity>(charging_point::Column::Id, id, col, value)
                    .await?
            }
            ColumnPick::Charger(col) => {
                self.set_column::<charger::Entity>(charger::Column::Id, id, col, value)
                    .await?
            }
        };
        if touched == 0 {
            return Err(DomainError::not_found(resource.entity_name(), id));
        }
        Ok(())
    }
}

enum ColumnPick {
    Facility(facility::Column),
    Station(station::Column),
    Point(charging_point::Column),
    Charger(charger::Column),
}

fn status_column(resource: ResourceRef) -> ColumnPick {
    match resource {
        ResourceRef::Facility(_) => ColumnPick::Facility(facility::Column::Status),
        ResourceRef::Station(_) => ColumnPick::Station(station::Column::Status),
        ResourceRef::Point(_) => ColumnPick::Point(charging_point::Column::Status),
        ResourceRef::Charger(_) => ColumnPick::Charger(charger::Column::Status),
    }
}

fn deleted_column(resource: ResourceRef) -> ColumnPick {
    match resource {
        ResourceRef::Facility(_) => ColumnPick::Facility(facility::Column::Deleted),
        ResourceRef::Station(_) => ColumnPick::Station(station::Column::Deleted),
        ResourceRef::Point(_) => ColumnPick::Point(charging_point::Column::Deleted),
        ResourceRef::Charger(_) => ColumnPick::Charger(charger::Column::Deleted),
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn status_from(raw: &str) -> ResourceStatus {
    ResourceStatus::from_str(raw).unwrap_or_else(|| {
        log::warn!("Unknown resource status {:?}, reading as inactive", raw);
        ResourceStatus::Inactive
    })
}

fn facility_to_domain(m: facility::Model) -> Facility {
    Facility {
        id: m.id,
        name: m.name,
        status: status_from(&m.status),
        deleted: m.deleted,
    }
}

fn station_to_domain(m: station::Model) -> Station {
    Station {
        id: m.id,
        facility_id: m.facility_id,
        name: m.name,
        status: status_from(&m.status),
        deleted: m.deleted,
    }
}

fn point_to_domain(m: charging_point::Model) -> ChargingPoint {
    ChargingPoint {
        id: m.id,
        station_id: m.station_id,
        name: m.name,
        price_per_kwh: m.price_per_kwh,
        status: status_from(&m.status),
        deleted: m.deleted,
    }
}

fn charger_to_domain(m: charger::Model) -> Charger {
    Charger {
        id: m.id,
        point_id: m.point_id,
        connector_type: m.connector_type,
        status: status_from(&m.status),
        deleted: m.deleted,
    }
}

// ── ResourceRepository impl ─────────────────────────────────────

#[async_trait]
impl ResourceRepository for SeaOrmResourceRepository {
    async fn save_facility(&self, f: Facility) -> DomainResult<()> {
        debug!("Saving facility: {}", f.id);
        let model = facility::ActiveModel {
            id: Set(f.id),
            name: Set(f.name),
            status: Set(f.status.as_str().to_string()),
            deleted: Set(f.deleted),
        };
        facility::Entity::insert(model)
            .on_conflict(
                OnConflict::column(facility::Column::Id)
                    .update_columns([
                        facility::Column::Name,
                        facility::Column::Status,
                        facility::Column::Deleted,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_facility(&self, id: i32) -> DomainResult<Option<Facility>> {
        let model = facility::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(facility_to_domain))
    }

    async fn save_station(&self, s: Station) -> DomainResult<()> {
        debug!("Saving station: {}", s.id);
        let model = station::ActiveModel {
            id: Set(s.id),
            facility_id: Set(s.facility_id),
            name: Set(s.name),
            status: Set(s.status.as_str().to_string()),
            deleted: Set(s.deleted),
        };
        station::Entity::insert(model)
            .on_conflict(
                OnConflict::column(station::Column::Id)
                    .update_columns([
                        station::Column::FacilityId,
                        station::Column::Name,
                        station::Column::Status,
                        station::Column::Deleted,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_station(&self, id: i32) -> DomainResult<Option<Station>> {
        let model = station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(station_to_domain))
    }

    async fn stations_of_facility(&self, facility_id: i32) -> DomainResult<Vec<Station>> {
        let models = station::Entity::find()
            .filter(station::Column::FacilityId.eq(facility_id))
            .order_by_asc(station::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(station_to_domain).collect())
    }

    async fn save_point(&self, p: ChargingPoint) -> DomainResult<()> {
        debug!("Saving charging point: {}", p.id);
        let model = charging_point::ActiveModel {
            id: Set(p.id),
            station_id: Set(p.station_id),
            name: Set(p.name),
            price_per_kwh: Set(p.price_per_kwh),
            status: Set(p.status.as_str().to_string()),
            deleted: Set(p.deleted),
        };
        charging_point::Entity::insert(model)
            .on_conflict(
                OnConflict::column(charging_point::Column::Id)
                    .update_columns([
                        charging_point::Column::StationId,
                        charging_point::Column::Name,
                        charging_point::Column::PricePerKwh,
                        charging_point::Column::Status,
                        charging_point::Column::Deleted,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_point(&self, id: i32) -> DomainResult<Option<ChargingPoint>> {
        let model = charging_point::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(point_to_domain))
    }

    async fn points_of_station(&self, station_id: i32) -> DomainResult<Vec<ChargingPoint>> {
        let models = charging_point::Entity::find()
            .filter(charging_point::Column::StationId.eq(station_id))
            .order_by_asc(charging_point::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(point_to_domain).collect())
    }

    async fn save_charger(&self, c: Charger) -> DomainResult<()> {
        debug!("Saving charger: {}", c.id);
        let model = charger::ActiveModel {
            id: Set(c.id),
            point_id: Set(c.point_id),
            connector_type: Set(c.connector_type),
            status: Set(c.status.as_str().to_string()),
            deleted: Set(c.deleted),
        };
        charger::Entity::insert(model)
            .on_conflict(
                OnConflict::column(charger::Column::Id)
                    .update_columns([
                        charger::Column::PointId,
                        charger::Column::ConnectorType,
                        charger::Column::Status,
                        charger::Column::Deleted,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_charger(&self, id: i32) -> DomainResult<Option<Charger>> {
        let model = charger::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(charger_to_domain))
    }

    async fn chargers_of_point(&self, point_id: i32) -> DomainResult<Vec<Charger>> {
        let models = charger::Entity::find()
            .filter(charger::Column::PointId.eq(point_id))
            .order_by_asc(charger::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(charger_to_domain).collect())
    }

    async fn update_status(&self, resource: ResourceRef, status: ResourceStatus) -> DomainResult<()> {
        debug!("Setting {} to {}", resource, status);
        self.set_for(resource, status_column, status.as_str().into())
            .await
    }

    async fn mark_deleted(&self, resource: ResourceRef) -> DomainResult<()> {
        debug!("Soft-deleting {}", resource);
        self.set_for(resource, deleted_column, true.into()).await
    }
}
