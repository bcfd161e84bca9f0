//! Subscription repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{PlanRegistration, SubscriptionPlan};
use crate::domain::DomainResult;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert or replace a plan together with its benefits
    async fn save_plan(&self, plan: SubscriptionPlan) -> DomainResult<()>;

    async fn find_plan(&self, id: i32) -> DomainResult<Option<SubscriptionPlan>>;

    /// Insert a new registration, returning it with its assigned id
    async fn insert_registration(&self, registration: PlanRegistration) -> DomainResult<PlanRegistration>;

    async fn find_registration(&self, id: i32) -> DomainResult<Option<PlanRegistration>>;

    async fn update_registration(&self, registration: PlanRegistration) -> DomainResult<()>;

    /// `ACTIVE` registrations of one driver (normally zero or one)
    async fn find_active_registrations_for_driver(
        &self,
        driver_id: i32,
    ) -> DomainResult<Vec<PlanRegistration>>;

    /// Registrations activated at some point whose window overlaps
    /// `[start, end)`, including those expired or cancelled since
    async fn find_registrations_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<PlanRegistration>>;

    /// `ACTIVE` registrations whose `end_date < now`
    async fn find_expired_registrations(&self, now: DateTime<Utc>) -> DomainResult<Vec<PlanRegistration>>;
}
