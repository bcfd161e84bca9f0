use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{
    DomainError, DomainResult, PlanRegistration, RegistrationStatus, SubscriptionPlan,
    SubscriptionRepository,
};

pub struct InMemorySubscriptionRepository {
    plans: DashMap<i32, SubscriptionPlan>,
    registrations: DashMap<i32, PlanRegistration>,
    next_registration_id: AtomicI32,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self {
            plans: DashMap::new(),
            registrations: DashMap::new(),
            next_registration_id: AtomicI32::new(1),
        }
    }

    fn registrations_where(&self, filter: impl Fn(&PlanRegistration) -> bool) -> Vec<PlanRegistration> {
        let mut found: Vec<PlanRegistration> = self
            .registrations
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by_key(|r| r.id);
        found
    }
}

impl Default for InMemorySubscriptionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save_plan(&self, plan: SubscriptionPlan) -> DomainResult<()> {
        self.plans.insert(plan.id, plan);
        Ok(())
    }

    async fn find_plan(&self, id: i32) -> DomainResult<Option<SubscriptionPlan>> {
        Ok(self.plans.get(&id).map(|p| p.clone()))
    }

    async fn insert_registration(&self, mut registration: PlanRegistration) -> DomainResult<PlanRegistration> {
        registration.id = self.next_registration_id.fetch_add(1, Ordering::SeqCst);
        self.registrations.insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn find_registration(&self, id: i32) -> DomainResult<Option<PlanRegistration>> {
        Ok(self.registrations.get(&id).map(|r| r.clone()))
    }

    async fn update_registration(&self, registration: PlanRegistration) -> DomainResult<()> {
        match self.registrations.get_mut(&registration.id) {
            Some(mut row) => {
                *row = registration;
                Ok(())
            }
            None => Err(DomainError::not_found("PlanRegistration", registration.id)),
        }
    }

    async fn find_active_registrations_for_driver(&self, driver_id: i32) -> DomainResult<Vec<PlanRegistration>> {
        Ok(self.registrations_where(|r| {
            r.driver_id == driver_id && r.status == RegistrationStatus::Active
        }))
    }

    async fn find_registrations_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<PlanRegistration>> {
        Ok(self.registrations_where(|r| r.overlaps(start, end)))
    }

    async fn find_expired_registrations(&self, now: DateTime<Utc>) -> DomainResult<Vec<PlanRegistration>> {
        Ok(self.registrations_where(|r| {
            r.status == RegistrationStatus::Active && r.end_date.is_some_and(|end| end < now)
        }))
    }
}
