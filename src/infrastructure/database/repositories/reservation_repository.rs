//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};

use super::db_err;
use crate::domain::reservation::{Reservation, ReservationRepository, ReservationStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::reservation;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> Reservation {
    Reservation {
        id: m.id,
        driver_id: m.driver_id,
        point_id: m.point_id,
        vehicle_id: m.vehicle_id,
        start_time: m.start_time,
        end_time: m.end_time,
        status: ReservationStatus::from_str(&m.status),
        created_at: m.created_at,
    }
}

fn domain_to_active(r: &Reservation) -> reservation::ActiveModel {
    reservation::ActiveModel {
        id: if r.id == 0 { NotSet } else { Set(r.id) },
        driver_id: Set(r.driver_id),
        point_id: Set(r.point_id),
        vehicle_id: Set(r.vehicle_id),
        start_time: Set(r.start_time),
        end_time: Set(r.end_time),
        status: Set(r.status.as_str().to_string()),
        created_at: Set(r.created_at),
    }
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn insert(&self, mut r: Reservation) -> DomainResult<Reservation> {
        r.id = 0;
        let model = domain_to_active(&r).insert(&self.db).await.map_err(db_err)?;
        debug!("Inserted reservation {} on point {}", model.id, model.point_id);
        Ok(model_to_domain(model))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn update(&self, r: Reservation) -> DomainResult<()> {
        debug!("Updating reservation: {}", r.id);

        let existing = reservation::Entity::find_by_id(r.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        if existing.is_none() {
            return Err(DomainError::not_found("Reservation", r.id));
        }

        domain_to_active(&r).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_active_for_point(&self, point_id: i32) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::PointId.eq(point_id))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .order_by_asc(reservation::Column::StartTime)
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_active_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::DriverId.eq(driver_id))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .order_by_asc(reservation::Column::StartTime)
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .filter(reservation::Column::EndTime.lt(now))
            .order_by_asc(reservation::Column::StartTime)
            .order_by_asc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::DriverId.eq(driver_id))
            .order_by_desc(reservation::Column::StartTime)
            .order_by_desc(reservation::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
