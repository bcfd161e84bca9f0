//! SeaORM implementation of SessionRepository
//!
//! The one-charging-session rules are backed by partial unique indexes, so a
//! racing insert fails here with `Conflict` even if the caller skipped its
//! own checks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use super::{db_err, parse_decimal};
use crate::domain::session::{ChargingSession, SessionOwner, SessionRepository, SessionStatus};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::charging_session;

pub struct SeaOrmSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn one_charging(&self, filter: Condition) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find()
            .filter(charging_session::Column::Status.eq(SessionStatus::Charging.as_str()))
            .filter(filter)
            .order_by_asc(charging_session::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn unbilled(&self, owner: Condition) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(owner)
            .order_by_asc(charging_session::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(crate) fn model_to_domain(m: charging_session::Model) -> ChargingSession {
    let owner = match (m.enterprise_id, m.vehicle_id) {
        (Some(enterprise_id), Some(vehicle_id)) => SessionOwner::Enterprise {
            enterprise_id,
            vehicle_id,
        },
        _ => SessionOwner::Driver {
            driver_id: m.driver_id.unwrap_or_default(),
        },
    };
    ChargingSession {
        id: m.id,
        owner,
        point_id: m.point_id,
        reservation_id: m.reservation_id,
        status: SessionStatus::from_str(&m.status),
        start_percentage: m.start_percentage,
        end_percentage: m.end_percentage,
        kwh_used: parse_decimal("charging_sessions.kwh_used", &m.kwh_used),
        cost: m.cost,
        overuse_fee: m.overuse_fee,
        discount_percent: parse_decimal("charging_sessions.discount_percent", &m.discount_percent),
        fee_waived: m.fee_waived,
        started_at: m.started_at,
        ended_at: m.ended_at,
        started_by_employee: m.started_by_employee,
        ended_by_employee: m.ended_by_employee,
        invoice_id: m.invoice_id,
        enterprise_invoice_id: m.enterprise_invoice_id,
    }
}

fn domain_to_active(s: &ChargingSession) -> charging_session::ActiveModel {
    charging_session::ActiveModel {
        id: if s.id == 0 { NotSet } else { Set(s.id) },
        driver_id: Set(s.owner.driver_id()),
        enterprise_id: Set(s.owner.enterprise_id()),
        vehicle_id: Set(s.owner.vehicle_id()),
        point_id: Set(s.point_id),
        reservation_id: Set(s.reservation_id),
        status: Set(s.status.as_str().to_string()),
        start_percentage: Set(s.start_percentage),
        end_percentage: Set(s.end_percentage),
        kwh_used: Set(s.kwh_used.to_string()),
        cost: Set(s.cost),
        overuse_fee: Set(s.overuse_fee),
        discount_percent: Set(s.discount_percent.to_string()),
        fee_waived: Set(s.fee_waived),
        started_at: Set(s.started_at),
        ended_at: Set(s.ended_at),
        started_by_employee: Set(s.started_by_employee),
        ended_by_employee: Set(s.ended_by_employee),
        invoice_id: Set(s.invoice_id),
        enterprise_invoice_id: Set(s.enterprise_invoice_id),
    }
}

fn completed_between(start: DateTime<Utc>, end: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(charging_session::Column::Status.eq(SessionStatus::Completed.as_str()))
        .add(charging_session::Column::EndedAt.gte(start))
        .add(charging_session::Column::EndedAt.lt(end))
}

// ── SessionRepository impl ──────────────────────────────────────

#[async_trait]
impl SessionRepository for SeaOrmSessionRepository {
    async fn insert(&self, mut s: ChargingSession) -> DomainResult<ChargingSession> {
        s.id = 0;
        let model = domain_to_active(&s)
            .insert(&self.db)
            .await
            .map_err(|e| match db_err(e) {
                DomainError::Conflict(_) => DomainError::Conflict(format!(
                    "{} or point {} already has a charging session",
                    s.owner, s.point_id
                )),
                other => other,
            })?;
        debug!("Inserted session {} on point {}", model.id, model.point_id);
        Ok(model_to_domain(model))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn update(&self, s: ChargingSession) -> DomainResult<()> {
        debug!("Updating session {} ({})", s.id, s.status);
        let existing = charging_session::Entity::find_by_id(s.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("ChargingSession", s.id));
        }
        domain_to_active(&s).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_charging_for_point(&self, point_id: i32) -> DomainResult<Option<ChargingSession>> {
        self.one_charging(Condition::all().add(charging_session::Column::PointId.eq(point_id)))
            .await
    }

    async fn find_charging_for_driver(&self, driver_id: i32) -> DomainResult<Option<ChargingSession>> {
        self.one_charging(Condition::all().add(charging_session::Column::DriverId.eq(driver_id)))
            .await
    }

    async fn find_charging_for_vehicle(&self, vehicle_id: i32) -> DomainResult<Option<ChargingSession>> {
        self.one_charging(Condition::all().add(charging_session::Column::VehicleId.eq(vehicle_id)))
            .await
    }

    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<ChargingSession>> {
        let models = charging_session::Entity::find()
            .filter(charging_session::Column::DriverId.eq(driver_id))
            .order_by_desc(charging_session::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_unbilled_for_driver(
        &self,
        driver_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        self.unbilled(
            completed_between(start, end)
                .add(charging_session::Column::DriverId.eq(driver_id))
                .add(charging_session::Column::InvoiceId.is_null()),
        )
        .await
    }

    async fn find_unbilled_for_enterprise(
        &self,
        enterprise_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        self.unbilled(
            completed_between(start, end)
                .add(charging_session::Column::EnterpriseId.eq(enterprise_id))
                .add(charging_session::Column::EnterpriseInvoiceId.is_null()),
        )
        .await
    }

    async fn enterprises_with_unbilled(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<i32>> {
        let ids: Vec<Option<i32>> = charging_session::Entity::find()
            .select_only()
            .column(charging_session::Column::EnterpriseId)
            .distinct()
            .filter(completed_between(start, end))
            .filter(charging_session::Column::EnterpriseId.is_not_null())
            .filter(charging_session::Column::EnterpriseInvoiceId.is_null())
            .order_by_asc(charging_session::Column::EnterpriseId)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(ids.into_iter().flatten().collect())
    }
}
