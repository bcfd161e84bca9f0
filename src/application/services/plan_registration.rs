//! Driver subscription lifecycle

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::application::report::JobReport;
use crate::domain::{DomainError, DomainResult, PlanRegistration, RepositoryProvider, SubscriptionPlan};
use crate::shared::AdmissionLocks;

/// `register` → PENDING, `activate` → ACTIVE (replacing any other ACTIVE
/// registration of the driver), `cancel`, and the expiry sweep.
pub struct PlanRegistrationService {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<AdmissionLocks>,
}

impl PlanRegistrationService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, locks: Arc<AdmissionLocks>) -> Self {
        Self { repos, locks }
    }

    /// Provision or replace a plan.
    pub async fn save_plan(&self, plan: SubscriptionPlan) -> DomainResult<()> {
        if plan.base_fee < 0 || plan.duration_days <= 0 || Duration::try_days(plan.duration_days).is_none() {
            return Err(DomainError::InvalidInput(format!(
                "plan {}: fee {} over {} days",
                plan.id, plan.base_fee, plan.duration_days
            )));
        }
        self.repos.subscriptions().save_plan(plan).await
    }

    pub async fn register(&self, driver_id: i32, plan_id: i32, now: DateTime<Utc>) -> DomainResult<PlanRegistration> {
        let plan = self.plan(plan_id).await?;
        if !plan.is_active {
            return Err(DomainError::InvalidInput(format!(
                "plan {} is no longer offered",
                plan_id
            )));
        }
        let registration = self
            .repos
            .subscriptions()
            .insert_registration(PlanRegistration::new(driver_id, plan_id, now))
            .await?;
        info!(registration_id = registration.id, driver_id, plan_id, "Plan registration requested");
        Ok(registration)
    }

    /// Activate a pending registration from `now` for the plan's duration.
    pub async fn activate(&self, registration_id: i32, now: DateTime<Utc>) -> DomainResult<PlanRegistration> {
        let pending = self.registration(registration_id).await?;
        let _driver = self.locks.drivers.lock(pending.driver_id).await;

        let mut registration = self.registration(registration_id).await?;
        let plan = self.plan(registration.plan_id).await?;
        registration.activate(now, plan.duration_days)?;

        let subs = self.repos.subscriptions();
        for mut previous in subs.find_active_registrations_for_driver(registration.driver_id).await? {
            if previous.id == registration.id {
                continue;
            }
            previous.cancel()?;
            subs.update_registration(previous.clone()).await?;
            info!(registration_id = previous.id, driver_id = previous.driver_id, "Superseded registration cancelled");
        }
        subs.update_registration(registration.clone()).await?;

        info!(
            registration_id,
            driver_id = registration.driver_id,
            plan_id = registration.plan_id,
            end_date = ?registration.end_date,
            "Plan registration activated"
        );
        Ok(registration)
    }

    pub async fn cancel(&self, registration_id: i32) -> DomainResult<PlanRegistration> {
        let mut registration = self.registration(registration_id).await?;
        registration.cancel()?;
        self.repos.subscriptions().update_registration(registration.clone()).await?;
        info!(registration_id, driver_id = registration.driver_id, "Plan registration cancelled");
        Ok(registration)
    }

    /// `ACTIVE` registrations past their end date become `EXPIRED`.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> DomainResult<JobReport> {
        let started = Instant::now();
        let mut report = JobReport::new("registration_expiry");
        let subs = self.repos.subscriptions();

        for mut registration in subs.find_expired_registrations(now).await? {
            let id = registration.id;
            let outcome = match registration.expire() {
                Ok(()) => subs.update_registration(registration).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => report.success(),
                Err(e) => report.failure(format!("registration {}", id), &e),
            }
        }
        Ok(report.finish(started))
    }

    pub async fn find(&self, registration_id: i32) -> DomainResult<Option<PlanRegistration>> {
        self.repos.subscriptions().find_registration(registration_id).await
    }

    async fn registration(&self, id: i32) -> DomainResult<PlanRegistration> {
        self.repos
            .subscriptions()
            .find_registration(id)
            .await?
            .ok_or_else(|| DomainError::not_found("PlanRegistration", id))
    }

    async fn plan(&self, id: i32) -> DomainResult<SubscriptionPlan> {
        self.repos
            .subscriptions()
            .find_plan(id)
            .await?
            .ok_or_else(|| DomainError::not_found("SubscriptionPlan", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::fixtures::{at, Fixture, BASIC_PLAN, PREMIUM_PLAN, RETIRED_PLAN};
    use crate::domain::RegistrationStatus;

    #[tokio::test]
    async fn register_then_activate() {
        let fx = Fixture::new().await;
        let plans = &fx.services.plans;

        let reg = plans.register(10, BASIC_PLAN, at(2025, 3, 1, 0, 0)).await.unwrap();
        assert_eq!(reg.status, RegistrationStatus::Pending);

        let active = plans.activate(reg.id, at(2025, 3, 2, 0, 0)).await.unwrap();
        assert_eq!(active.status, RegistrationStatus::Active);
        assert_eq!(active.start_date, Some(at(2025, 3, 2, 0, 0)));
        assert_eq!(active.end_date, Some(at(2025, 4, 1, 0, 0)));
    }

    #[tokio::test]
    async fn activation_cancels_previous_active() {
        let fx = Fixture::new().await;
        let first = fx.subscribe(10, BASIC_PLAN, at(2025, 3, 1, 0, 0)).await;
        let second = fx.subscribe(10, PREMIUM_PLAN, at(2025, 3, 10, 0, 0)).await;

        let plans = &fx.services.plans;
        let first = plans.find(first.id).await.unwrap().unwrap();
        assert_eq!(first.status, RegistrationStatus::Cancelled);

        let active = fx
            .repos
            .subscriptions()
            .find_active_registrations_for_driver(10)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);
    }

    #[tokio::test]
    async fn plan_duration_must_be_representable() {
        let fx = Fixture::new().await;
        for days in [0, i64::MAX / 2] {
            let err = fx
                .services
                .plans
                .save_plan(SubscriptionPlan::new(9, "Forever", 1_000, days))
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)));
        }
        assert!(fx.repos.subscriptions().find_plan(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retired_plan_cannot_be_registered() {
        let fx = Fixture::new().await;
        let err = fx
            .services
            .plans
            .register(10, RETIRED_PLAN, at(2025, 3, 1, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_plan_is_not_found() {
        let fx = Fixture::new().await;
        let err = fx.services.plans.register(10, 999, at(2025, 3, 1, 0, 0)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn sweep_expires_lapsed_registrations() {
        let fx = Fixture::new().await;
        let reg = fx.subscribe(10, BASIC_PLAN, at(2025, 1, 1, 0, 0)).await;
        fx.subscribe(11, BASIC_PLAN, at(2025, 1, 20, 0, 0)).await;

        let report = fx.services.plans.sweep_expired(at(2025, 2, 5, 0, 0)).await.unwrap();
        assert_eq!(report.succeeded, 1);
        let reg = fx.services.plans.find(reg.id).await.unwrap().unwrap();
        assert_eq!(reg.status, RegistrationStatus::Expired);
    }

    #[tokio::test]
    async fn cancel_twice_fails() {
        let fx = Fixture::new().await;
        let reg = fx.services.plans.register(10, BASIC_PLAN, at(2025, 3, 1, 0, 0)).await.unwrap();
        fx.services.plans.cancel(reg.id).await.unwrap();
        assert!(matches!(
            fx.services.plans.cancel(reg.id).await,
            Err(DomainError::InvalidTransition(_))
        ));
    }
}
