//! SeaORM implementation of SubscriptionRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use super::db_err;
use crate::domain::subscription::{
    PlanBenefit, PlanRegistration, RegistrationStatus, SubscriptionPlan, SubscriptionRepository,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{plan_benefit, plan_registration, subscription_plan};

pub struct SeaOrmSubscriptionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSubscriptionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn registrations_where(
        &self,
        filter: sea_orm::Condition,
    ) -> DomainResult<Vec<PlanRegistration>> {
        let models = plan_registration::Entity::find()
            .filter(filter)
            .order_by_asc(plan_registration::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(registration_to_domain).collect())
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn benefit_from_row(row: plan_benefit::Model) -> Option<PlanBenefit> {
    let benefit = PlanBenefit::from_parts(&row.kind, row.value.as_deref());
    if benefit.is_none() {
        warn!(
            "Skipping unreadable benefit {} of plan {}: {} = {:?}",
            row.id, row.plan_id, row.kind, row.value
        );
    }
    benefit
}

fn registration_to_domain(m: plan_registration::Model) -> PlanRegistration {
    PlanRegistration {
        id: m.id,
        driver_id: m.driver_id,
        plan_id: m.plan_id,
        status: RegistrationStatus::from_str(&m.status),
        start_date: m.start_date,
        end_date: m.end_date,
        created_at: m.created_at,
    }
}

fn registration_to_active(r: &PlanRegistration) -> plan_registration::ActiveModel {
    plan_registration::ActiveModel {
        id: if r.id == 0 { NotSet } else { Set(r.id) },
        driver_id: Set(r.driver_id),
        plan_id: Set(r.plan_id),
        status: Set(r.status.as_str().to_string()),
        start_date: Set(r.start_date),
        end_date: Set(r.end_date),
        created_at: Set(r.created_at),
    }
}

fn active_status() -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(plan_registration::Column::Status.eq(RegistrationStatus::Active.as_str()))
}

// ── SubscriptionRepository impl ─────────────────────────────────

#[async_trait]
impl SubscriptionRepository for SeaOrmSubscriptionRepository {
    async fn save_plan(&self, plan: SubscriptionPlan) -> DomainResult<()> {
        debug!("Saving plan {} with {} benefits", plan.id, plan.benefits.len());
        let txn = self.db.begin().await.map_err(db_err)?;

        let model = subscription_plan::ActiveModel {
            id: Set(plan.id),
            name: Set(plan.name.clone()),
            base_fee: Set(plan.base_fee),
            duration_days: Set(plan.duration_days),
            is_active: Set(plan.is_active),
        };
        subscription_plan::Entity::insert(model)
            .on_conflict(
                OnConflict::column(subscription_plan::Column::Id)
                    .update_columns([
                        subscription_plan::Column::Name,
                        subscription_plan::Column::BaseFee,
                        subscription_plan::Column::DurationDays,
                        subscription_plan::Column::IsActive,
                    ])
                    .to_owned(),
            )
            .exec(&txn)
            .await
            .map_err(db_err)?;

        plan_benefit::Entity::delete_many()
            .filter(plan_benefit::Column::PlanId.eq(plan.id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        for benefit in &plan.benefits {
            plan_benefit::ActiveModel {
                id: NotSet,
                plan_id: Set(plan.id),
                kind: Set(benefit.kind().to_string()),
                value: Set(benefit.value()),
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)
    }

    async fn find_plan(&self, id: i32) -> DomainResult<Option<SubscriptionPlan>> {
        let Some(m) = subscription_plan::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let benefits = plan_benefit::Entity::find()
            .filter(plan_benefit::Column::PlanId.eq(id))
            .order_by_asc(plan_benefit::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .filter_map(benefit_from_row)
            .collect();

        Ok(Some(SubscriptionPlan {
            id: m.id,
            name: m.name,
            base_fee: m.base_fee,
            duration_days: m.duration_days,
            benefits,
            is_active: m.is_active,
        }))
    }

    async fn insert_registration(&self, mut r: PlanRegistration) -> DomainResult<PlanRegistration> {
        r.id = 0;
        let model = registration_to_active(&r)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        debug!("Inserted registration {} for driver {}", model.id, model.driver_id);
        Ok(registration_to_domain(model))
    }

    async fn find_registration(&self, id: i32) -> DomainResult<Option<PlanRegistration>> {
        let model = plan_registration::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(registration_to_domain))
    }

    async fn update_registration(&self, r: PlanRegistration) -> DomainResult<()> {
        debug!("Updating registration {} to {}", r.id, r.status);
        let existing = plan_registration::Entity::find_by_id(r.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("PlanRegistration", r.id));
        }
        registration_to_active(&r)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_active_registrations_for_driver(
        &self,
        driver_id: i32,
    ) -> DomainResult<Vec<PlanRegistration>> {
        self.registrations_where(
            active_status().add(plan_registration::Column::DriverId.eq(driver_id)),
        )
        .await
    }

    async fn find_registrations_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<PlanRegistration>> {
        self.registrations_where(
            sea_orm::Condition::all()
                .add(plan_registration::Column::StartDate.lt(end))
                .add(plan_registration::Column::EndDate.gte(start)),
        )
        .await
    }

    async fn find_expired_registrations(&self, now: DateTime<Utc>) -> DomainResult<Vec<PlanRegistration>> {
        self.registrations_where(active_status().add(plan_registration::Column::EndDate.lt(now)))
            .await
    }
}
