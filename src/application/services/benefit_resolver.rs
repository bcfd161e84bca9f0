//! Resolves a driver's subscription into pricing modifiers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{
    DomainError, DomainResult, PlanRegistration, RepositoryProvider, ResolvedBenefits,
    SubscriptionPlan,
};

/// Reads the driver's registration on every call; nothing is cached, so a
/// plan that lapses mid-session stops applying at stop time.
pub struct BenefitResolver {
    repos: Arc<dyn RepositoryProvider>,
}

impl BenefitResolver {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// The `ACTIVE` registration valid at `now`, with its plan.
    pub async fn active_registration(
        &self,
        driver_id: i32,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<(PlanRegistration, SubscriptionPlan)>> {
        let mut valid: Vec<PlanRegistration> = self
            .repos
            .subscriptions()
            .find_active_registrations_for_driver(driver_id)
            .await?
            .into_iter()
            .filter(|r| r.is_valid_at(now))
            .collect();
        if valid.len() > 1 {
            warn!(driver_id, count = valid.len(), "Driver has several active registrations, using newest");
        }
        valid.sort_by_key(|r| r.start_date);

        let Some(registration) = valid.pop() else {
            return Ok(None);
        };
        let plan = self
            .repos
            .subscriptions()
            .find_plan(registration.plan_id)
            .await?
            .ok_or_else(|| DomainError::not_found("SubscriptionPlan", registration.plan_id))?;
        Ok(Some((registration, plan)))
    }

    pub async fn resolve(&self, driver_id: i32, now: DateTime<Utc>) -> DomainResult<ResolvedBenefits> {
        Ok(self
            .active_registration(driver_id, now)
            .await?
            .map(|(_, plan)| ResolvedBenefits::from_benefits(&plan.benefits))
            .unwrap_or_default())
    }

    /// `max(0, overuse_minutes - grace) * per_minute_rate`
    pub async fn overuse_fee(
        &self,
        driver_id: i32,
        overuse_minutes: i64,
        per_minute_rate: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<i64> {
        let benefits = self.resolve(driver_id, now).await?;
        Ok(benefits.overuse_fee(overuse_minutes, per_minute_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::fixtures::{at, Fixture, PREMIUM_PLAN};
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn no_registration_means_no_benefits() {
        let fx = Fixture::new().await;
        let benefits = fx.services.benefits.resolve(10, at(2025, 3, 1, 0, 0)).await.unwrap();
        assert_eq!(benefits, ResolvedBenefits::none());
    }

    #[tokio::test]
    async fn active_plan_resolves_its_benefits() {
        let fx = Fixture::new().await;
        fx.subscribe(10, PREMIUM_PLAN, at(2025, 3, 1, 0, 0)).await;

        let benefits = fx.services.benefits.resolve(10, at(2025, 3, 5, 0, 0)).await.unwrap();
        assert_eq!(benefits.discount_percent, Decimal::from(15));
        assert!(benefits.fee_waived);
        assert_eq!(benefits.grace_minutes, 15);
    }

    #[tokio::test]
    async fn lapsed_registration_gives_nothing() {
        let fx = Fixture::new().await;
        fx.subscribe(10, PREMIUM_PLAN, at(2025, 1, 1, 0, 0)).await;

        // Premium runs 30 days.
        let benefits = fx.services.benefits.resolve(10, at(2025, 2, 15, 0, 0)).await.unwrap();
        assert_eq!(benefits, ResolvedBenefits::none());
    }

    #[tokio::test]
    async fn overuse_fee_after_grace() {
        let fx = Fixture::new().await;
        fx.subscribe(10, PREMIUM_PLAN, at(2025, 3, 1, 0, 0)).await;
        let now = at(2025, 3, 2, 0, 0);

        let resolver = &fx.services.benefits;
        assert_eq!(resolver.overuse_fee(10, 10, 1000, now).await.unwrap(), 0);
        assert_eq!(resolver.overuse_fee(10, 20, 1000, now).await.unwrap(), 5000);
        assert_eq!(resolver.overuse_fee(11, 20, 1000, now).await.unwrap(), 20_000);
    }
}
