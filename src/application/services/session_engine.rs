//! Charging session admission, stop and cancel
//!
//! `CHARGING → {COMPLETED, CANCELLED}`; both are terminal.
//!
//! Admission is a check-then-write sequence. It runs under the point lock,
//! then the driver (or vehicle) lock, so two concurrent starts on the same
//! point or for the same driver are serialized. Storage backends that carry
//! unique indexes on charging sessions reject a duplicate that slips past.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::application::ports::{Notifier, SubscriptionProofVerifier};
use crate::domain::session::pricing;
use crate::domain::session::SessionCharge;
use crate::domain::{
    AccountStatus, ChargingSession, DomainError, DomainResult, RepositoryProvider, Reservation,
    ResourceStatus, SessionOwner,
};
use crate::notifications::{Event, SessionCompletedEvent, SessionStartedEvent};
use crate::shared::AdmissionLocks;

use super::{BenefitResolver, ReservationLedger, ResourceRegistry};

/// Rates the engine prices sessions with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Flat enterprise rate per kWh; enterprise sessions get no discount
    pub enterprise_rate_per_kwh: i64,
    /// Charged per minute a session runs past its consumed reservation
    pub overuse_rate_per_minute: i64,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            enterprise_rate_per_kwh: 3000,
            overuse_rate_per_minute: 1000,
        }
    }
}

/// Who starts charging where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRequest {
    pub owner: SessionOwner,
    pub point_id: i32,
    pub start_percentage: i32,
    /// Staff member operating the point on the owner's behalf
    pub employee_id: Option<i32>,
}

impl StartRequest {
    pub fn driver(driver_id: i32, point_id: i32, start_percentage: i32) -> Self {
        Self {
            owner: SessionOwner::Driver { driver_id },
            point_id,
            start_percentage,
            employee_id: None,
        }
    }

    pub fn fleet(enterprise_id: i32, vehicle_id: i32, point_id: i32, start_percentage: i32) -> Self {
        Self {
            owner: SessionOwner::Enterprise {
                enterprise_id,
                vehicle_id,
            },
            point_id,
            start_percentage,
            employee_id: None,
        }
    }

    pub fn by_employee(mut self, employee_id: i32) -> Self {
        self.employee_id = Some(employee_id);
        self
    }
}

pub struct SessionEngine {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<ResourceRegistry>,
    ledger: Arc<ReservationLedger>,
    benefits: Arc<BenefitResolver>,
    verifier: Arc<dyn SubscriptionProofVerifier>,
    locks: Arc<AdmissionLocks>,
    notifier: Arc<dyn Notifier>,
    pricing: PricingPolicy,
}

impl SessionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        registry: Arc<ResourceRegistry>,
        ledger: Arc<ReservationLedger>,
        benefits: Arc<BenefitResolver>,
        verifier: Arc<dyn SubscriptionProofVerifier>,
        locks: Arc<AdmissionLocks>,
        notifier: Arc<dyn Notifier>,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            repos,
            registry,
            ledger,
            benefits,
            verifier,
            locks,
            notifier,
            pricing,
        }
    }

    /// Admit a session onto a point and mark the point in use.
    pub async fn start(&self, request: StartRequest, now: DateTime<Utc>) -> DomainResult<ChargingSession> {
        pricing::validate_percentage(request.start_percentage)?;
        if let Some(driver_id) = request.owner.driver_id() {
            if self.repos.accounts().status(driver_id).await? == AccountStatus::Suspended {
                return Err(DomainError::AccountSuspended(driver_id));
            }
        }

        let _point = self.locks.points.lock(request.point_id).await;
        let _owner = match request.owner {
            SessionOwner::Driver { driver_id } => self.locks.drivers.lock(driver_id).await,
            SessionOwner::Enterprise { vehicle_id, .. } => self.locks.vehicles.lock(vehicle_id).await,
        };

        let point = self
            .repos
            .resources()
            .find_point(request.point_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingPoint", request.point_id))?;

        self.ensure_no_running_session(&request).await?;

        if !point.accepts_session() {
            return Err(DomainError::ResourceUnavailable(format!(
                "point {} is {}",
                point.id, point.status
            )));
        }
        let reservation = self.reservation_gate(&request, point.status, now).await?;

        self.registry.start_using(point.id).await?;

        let mut session = ChargingSession::new(request.owner, point.id, request.start_percentage, now);
        session.reservation_id = reservation.as_ref().map(|r| r.id);
        session.started_by_employee = request.employee_id;

        let session = match self.repos.sessions().insert(session).await {
            Ok(s) => s,
            Err(e) => {
                if let Err(release) = self.registry.stop_using(point.id).await {
                    error!(point_id = point.id, error = %release, "Failed to release point after insert error");
                }
                return Err(e);
            }
        };

        if let Some(reservation) = reservation {
            let reservation_id = reservation.id;
            if let Err(e) = self.ledger.consume(reservation).await {
                warn!(reservation_id, session_id = session.id, error = %e, "Failed to mark reservation consumed");
            }
        }

        metrics::counter!("charging_sessions_total", "outcome" => "started").increment(1);
        info!(
            session_id = session.id,
            point_id = session.point_id,
            owner = %session.owner,
            start_percentage = session.start_percentage,
            "Charging session started"
        );
        self.notifier.notify(Event::SessionStarted(SessionStartedEvent {
            session_id: session.id,
            point_id: session.point_id,
            driver_id: session.owner.driver_id(),
            enterprise_id: session.owner.enterprise_id(),
            reservation_id: session.reservation_id,
            timestamp: now,
        }));
        Ok(session)
    }

    /// Walk-in start gated by a scanned subscription proof.
    ///
    /// The proof must be valid and name a registration of the requesting
    /// driver that is in force at `now`.
    pub async fn start_verified(
        &self,
        code: &str,
        request: StartRequest,
        now: DateTime<Utc>,
    ) -> DomainResult<ChargingSession> {
        let driver_id = request.owner.driver_id().ok_or_else(|| {
            DomainError::InvalidInput("subscription proof applies to drivers only".into())
        })?;
        let proof = self.verifier.verify(code).await?;
        if !proof.valid {
            return Err(DomainError::InvalidInput("subscription proof rejected".into()));
        }
        let registration = self
            .repos
            .subscriptions()
            .find_registration(proof.registration_id)
            .await?
            .ok_or_else(|| DomainError::not_found("PlanRegistration", proof.registration_id))?;
        if registration.driver_id != driver_id || !registration.is_valid_at(now) {
            return Err(DomainError::InvalidInput(format!(
                "registration {} does not cover driver {} now",
                registration.id, driver_id
            )));
        }
        self.start(request, now).await
    }

    /// Price and complete a charging session, then release its point.
    pub async fn stop(
        &self,
        session_id: i32,
        end_percentage: i32,
        employee_id: Option<i32>,
        now: DateTime<Utc>,
    ) -> DomainResult<ChargingSession> {
        let point_id = self.get(session_id).await?.point_id;
        let _point = self.locks.points.lock(point_id).await;

        let mut session = self.get(session_id).await?;
        if !session.is_charging() {
            return Err(DomainError::InvalidTransition(format!(
                "session {} is {}",
                session_id, session.status
            )));
        }

        let kwh = pricing::kwh_used(session.start_percentage, end_percentage)?;
        let charge = self.price(&session, kwh, end_percentage, employee_id, now).await?;
        session.complete(charge, now)?;
        self.repos.sessions().update(session.clone()).await?;

        if let Err(e) = self.registry.stop_using(point_id).await {
            error!(session_id, point_id, error = %e, "Session completed but point was not released");
            return Err(e);
        }

        metrics::counter!("charging_sessions_total", "outcome" => "completed").increment(1);
        info!(
            session_id,
            point_id,
            kwh_used = %session.kwh_used,
            cost = session.cost,
            overuse_fee = session.overuse_fee,
            "Charging session completed"
        );
        self.notifier.notify(Event::SessionCompleted(SessionCompletedEvent {
            session_id,
            point_id,
            driver_id: session.owner.driver_id(),
            kwh_used: session.kwh_used.to_string(),
            cost: session.cost,
            overuse_fee: session.overuse_fee,
            timestamp: now,
        }));
        Ok(session)
    }

    /// Abort a charging session without charge.
    pub async fn cancel(&self, session_id: i32, now: DateTime<Utc>) -> DomainResult<ChargingSession> {
        let point_id = self.get(session_id).await?.point_id;
        let _point = self.locks.points.lock(point_id).await;

        let mut session = self.get(session_id).await?;
        session.cancel(now)?;
        self.repos.sessions().update(session.clone()).await?;
        self.registry.stop_using(point_id).await?;

        metrics::counter!("charging_sessions_total", "outcome" => "cancelled").increment(1);
        info!(session_id, point_id, "Charging session cancelled");
        Ok(session)
    }

    pub async fn find(&self, session_id: i32) -> DomainResult<Option<ChargingSession>> {
        self.repos.sessions().find_by_id(session_id).await
    }

    /// Session history of a driver, newest first.
    pub async fn for_driver(&self, driver_id: i32) -> DomainResult<Vec<ChargingSession>> {
        self.repos.sessions().find_for_driver(driver_id).await
    }

    async fn ensure_no_running_session(&self, request: &StartRequest) -> DomainResult<()> {
        let sessions = self.repos.sessions();
        if let Some(running) = sessions.find_charging_for_point(request.point_id).await? {
            return Err(DomainError::Conflict(format!(
                "point {} already has charging session {}",
                request.point_id, running.id
            )));
        }
        let running = match request.owner {
            SessionOwner::Driver { driver_id } => sessions.find_charging_for_driver(driver_id).await?,
            SessionOwner::Enterprise { vehicle_id, .. } => {
                sessions.find_charging_for_vehicle(vehicle_id).await?
            }
        };
        if let Some(running) = running {
            return Err(DomainError::Conflict(format!(
                "{} already has charging session {} on point {}",
                request.owner, running.id, running.point_id
            )));
        }
        Ok(())
    }

    /// A reservation covering `now` admits only its holder; a booked point
    /// without one admits nobody.
    async fn reservation_gate(
        &self,
        request: &StartRequest,
        point_status: ResourceStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Reservation>> {
        match self.ledger.covering(request.point_id, now).await? {
            Some(r) if Some(r.driver_id) == request.owner.driver_id() => Ok(Some(r)),
            Some(r) => Err(DomainError::ResourceUnavailable(format!(
                "point {} is reserved by another driver until {}",
                request.point_id, r.end_time
            ))),
            None if point_status == ResourceStatus::Booked => {
                Err(DomainError::ResourceUnavailable(format!(
                    "point {} is booked",
                    request.point_id
                )))
            }
            None => Ok(None),
        }
    }

    async fn price(
        &self,
        session: &ChargingSession,
        kwh: Decimal,
        end_percentage: i32,
        employee_id: Option<i32>,
        now: DateTime<Utc>,
    ) -> DomainResult<SessionCharge> {
        let mut charge = SessionCharge {
            end_percentage,
            kwh_used: kwh,
            cost: 0,
            overuse_fee: 0,
            discount_percent: Decimal::ZERO,
            fee_waived: false,
            ended_by_employee: employee_id,
        };

        match session.owner {
            SessionOwner::Enterprise { .. } => {
                charge.cost =
                    pricing::discounted_cost(kwh, self.pricing.enterprise_rate_per_kwh, Decimal::ZERO)?;
            }
            SessionOwner::Driver { driver_id } => {
                let point = self
                    .repos
                    .resources()
                    .find_point(session.point_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("ChargingPoint", session.point_id))?;
                let benefits = self.benefits.resolve(driver_id, now).await?;

                charge.cost = pricing::discounted_cost(kwh, point.price_per_kwh, benefits.discount_percent)?;
                charge.discount_percent = benefits.discount_percent;
                charge.fee_waived = benefits.fee_waived;

                if let Some(reservation_id) = session.reservation_id {
                    let overrun = self.overrun_minutes(reservation_id, now).await?;
                    charge.overuse_fee =
                        benefits.overuse_fee(overrun, self.pricing.overuse_rate_per_minute);
                }
            }
        }
        Ok(charge)
    }

    /// Whole minutes past the consumed reservation's end, started minutes included.
    async fn overrun_minutes(&self, reservation_id: i32, now: DateTime<Utc>) -> DomainResult<i64> {
        let Some(reservation) = self.ledger.find(reservation_id).await? else {
            return Ok(0);
        };
        let seconds = (now - reservation.end_time).num_seconds();
        Ok(if seconds <= 0 { 0 } else { (seconds + 59) / 60 })
    }

    async fn get(&self, session_id: i32) -> DomainResult<ChargingSession> {
        self.repos
            .sessions()
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ChargingSession", session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::fixtures::{at, Fixture, BASIC_PLAN, PREMIUM_PLAN};
    use crate::domain::{ResourceRef, ReservationStatus, SessionStatus};

    #[tokio::test]
    async fn start_marks_point_and_station_using() {
        let fx = Fixture::new().await;
        let session = fx
            .services
            .sessions
            .start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 0))
            .await
            .unwrap();

        assert_eq!(session.status, SessionStatus::Charging);
        assert_eq!(session.cost, 0);
        assert_eq!(session.kwh_used, Decimal::ZERO);
        let registry = &fx.services.registry;
        assert_eq!(registry.status_of(ResourceRef::Point(1)).await.unwrap(), ResourceStatus::Using);
        assert_eq!(registry.status_of(ResourceRef::Station(1)).await.unwrap(), ResourceStatus::Using);
        assert_eq!(fx.notifier.count("session_started"), 1);
    }

    #[tokio::test]
    async fn second_start_on_point_conflicts() {
        let fx = Fixture::new().await;
        let engine = &fx.services.sessions;
        let now = at(2025, 3, 1, 9, 0);

        engine.start(StartRequest::driver(10, 1, 20), now).await.unwrap();
        let err = engine.start(StartRequest::driver(11, 1, 30), now).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn driver_cannot_charge_twice() {
        let fx = Fixture::new().await;
        let engine = &fx.services.sessions;
        let now = at(2025, 3, 1, 9, 0);

        engine.start(StartRequest::driver(10, 1, 20), now).await.unwrap();
        let err = engine.start(StartRequest::driver(10, 2, 20), now).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(
            fx.services.registry.status_of(ResourceRef::Point(2)).await.unwrap(),
            ResourceStatus::Active
        );
    }

    #[tokio::test]
    async fn fleet_vehicle_cannot_charge_twice() {
        let fx = Fixture::new().await;
        let engine = &fx.services.sessions;
        let now = at(2025, 3, 1, 9, 0);

        engine.start(StartRequest::fleet(5, 500, 1, 10), now).await.unwrap();
        let err = engine.start(StartRequest::fleet(5, 500, 2, 10), now).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        engine.start(StartRequest::fleet(5, 501, 2, 10), now).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_starts_admit_one() {
        let fx = Fixture::new().await;
        let now = at(2025, 3, 1, 9, 0);

        let handles: Vec<_> = (0..8)
            .map(|driver| {
                let engine = Arc::clone(&fx.services.sessions);
                tokio::spawn(async move { engine.start(StartRequest::driver(100 + driver, 1, 20), now).await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn suspended_driver_refused() {
        let fx = Fixture::new().await;
        fx.repos.accounts().set_status(10, AccountStatus::Suspended).await.unwrap();

        let err = fx
            .services
            .sessions
            .start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AccountSuspended(10)));
    }

    #[tokio::test]
    async fn invalid_percentage_refused() {
        let fx = Fixture::new().await;
        let err = fx
            .services
            .sessions
            .start(StartRequest::driver(10, 1, 120), at(2025, 3, 1, 9, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn maintenance_point_unavailable() {
        let fx = Fixture::new().await;
        fx.services
            .registry
            .set_status(ResourceRef::Point(1), ResourceStatus::Maintenance)
            .await
            .unwrap();
        let err = fx
            .services
            .sessions
            .start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ResourceUnavailable(_)));
    }

    #[tokio::test]
    async fn stop_without_plan_charges_full_price() {
        let fx = Fixture::new().await;
        let engine = &fx.services.sessions;

        let s = engine.start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 0)).await.unwrap();
        let done = engine.stop(s.id, 80, None, at(2025, 3, 1, 10, 0)).await.unwrap();

        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.kwh_used, Decimal::from(30));
        assert_eq!(done.cost, 90_000);
        assert_eq!(done.ended_at, Some(at(2025, 3, 1, 10, 0)));
        assert_eq!(
            fx.services.registry.status_of(ResourceRef::Station(1)).await.unwrap(),
            ResourceStatus::Active
        );
        assert_eq!(fx.notifier.count("session_completed"), 1);
    }

    #[tokio::test]
    async fn stop_applies_plan_discount() {
        let fx = Fixture::new().await;
        fx.subscribe(10, BASIC_PLAN, at(2025, 3, 1, 0, 0)).await;
        let engine = &fx.services.sessions;

        let s = engine.start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 0)).await.unwrap();
        let done = engine.stop(s.id, 80, None, at(2025, 3, 1, 10, 0)).await.unwrap();

        assert_eq!(done.cost, 76_500);
        assert_eq!(done.discount_percent, Decimal::from(15));
        assert!(!done.fee_waived);
    }

    #[tokio::test]
    async fn fleet_sessions_use_flat_rate() {
        let fx = Fixture::new().await;
        let engine = &fx.services.sessions;

        let s = engine.start(StartRequest::fleet(5, 500, 3, 10), at(2025, 3, 1, 9, 0)).await.unwrap();
        let done = engine.stop(s.id, 30, None, at(2025, 3, 1, 10, 0)).await.unwrap();
        // 10 kWh at the flat 2500 rate, point price ignored.
        assert_eq!(done.cost, 25_000);
        assert_eq!(done.discount_percent, Decimal::ZERO);
    }

    #[tokio::test]
    async fn end_below_start_is_invalid_and_keeps_charging() {
        let fx = Fixture::new().await;
        let engine = &fx.services.sessions;

        let s = engine.start(StartRequest::driver(10, 1, 50), at(2025, 3, 1, 9, 0)).await.unwrap();
        let err = engine.stop(s.id, 40, None, at(2025, 3, 1, 10, 0)).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let still = engine.find(s.id).await.unwrap().unwrap();
        assert!(still.is_charging());
        assert_eq!(
            fx.services.registry.status_of(ResourceRef::Point(1)).await.unwrap(),
            ResourceStatus::Using
        );
    }

    #[tokio::test]
    async fn stopped_session_is_terminal() {
        let fx = Fixture::new().await;
        let engine = &fx.services.sessions;

        let s = engine.start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 0)).await.unwrap();
        engine.stop(s.id, 80, Some(77), at(2025, 3, 1, 10, 0)).await.unwrap();

        assert!(matches!(
            engine.stop(s.id, 90, None, at(2025, 3, 1, 11, 0)).await,
            Err(DomainError::InvalidTransition(_))
        ));
        assert!(matches!(
            engine.cancel(s.id, at(2025, 3, 1, 11, 0)).await,
            Err(DomainError::InvalidTransition(_))
        ));
        let stored = engine.find(s.id).await.unwrap().unwrap();
        assert_eq!(stored.ended_by_employee, Some(77));
    }

    #[tokio::test]
    async fn cancel_releases_point_without_cost() {
        let fx = Fixture::new().await;
        let engine = &fx.services.sessions;

        let s = engine.start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 0)).await.unwrap();
        let cancelled = engine.cancel(s.id, at(2025, 3, 1, 9, 5)).await.unwrap();

        assert_eq!(cancelled.status, SessionStatus::Cancelled);
        assert_eq!(cancelled.cost, 0);
        assert_eq!(
            fx.services.registry.status_of(ResourceRef::Point(1)).await.unwrap(),
            ResourceStatus::Active
        );
        // The point is free again.
        engine.start(StartRequest::driver(11, 1, 20), at(2025, 3, 1, 9, 10)).await.unwrap();
    }

    #[tokio::test]
    async fn reservation_holder_consumes_booking() {
        let fx = Fixture::new().await;
        let r = fx
            .services
            .reservations
            .create(10, 1, None, 30, at(2025, 3, 1, 9, 0))
            .await
            .unwrap();

        let s = fx
            .services
            .sessions
            .start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 10))
            .await
            .unwrap();
        assert_eq!(s.reservation_id, Some(r.id));

        let r = fx.services.reservations.find(r.id).await.unwrap().unwrap();
        assert_eq!(r.status, ReservationStatus::Completed);
    }

    #[tokio::test]
    async fn booked_point_refuses_other_drivers() {
        let fx = Fixture::new().await;
        fx.services
            .reservations
            .create(10, 1, None, 30, at(2025, 3, 1, 9, 0))
            .await
            .unwrap();

        let err = fx
            .services
            .sessions
            .start(StartRequest::driver(11, 1, 20), at(2025, 3, 1, 9, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ResourceUnavailable(_)));
    }

    #[tokio::test]
    async fn overrun_past_reservation_is_charged() {
        let fx = Fixture::new().await;
        fx.services
            .reservations
            .create(10, 1, None, 30, at(2025, 3, 1, 9, 0))
            .await
            .unwrap();
        let engine = &fx.services.sessions;

        let s = engine.start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 5)).await.unwrap();
        // Reservation ended 09:30; stopped 09:50 -> 20 minutes at 1000.
        let done = engine.stop(s.id, 80, None, at(2025, 3, 1, 9, 50)).await.unwrap();
        assert_eq!(done.overuse_fee, 20_000);
    }

    #[tokio::test]
    async fn grace_time_reduces_overrun() {
        let fx = Fixture::new().await;
        fx.subscribe(10, PREMIUM_PLAN, at(2025, 3, 1, 0, 0)).await;
        fx.services
            .reservations
            .create(10, 1, None, 30, at(2025, 3, 1, 9, 0))
            .await
            .unwrap();
        let engine = &fx.services.sessions;

        let s = engine.start(StartRequest::driver(10, 1, 20), at(2025, 3, 1, 9, 5)).await.unwrap();
        let done = engine.stop(s.id, 80, None, at(2025, 3, 1, 9, 50)).await.unwrap();
        assert_eq!(done.overuse_fee, 5_000);
        assert!(done.fee_waived);
    }

    #[tokio::test]
    async fn verified_walk_in_needs_own_valid_registration() {
        let fx = Fixture::new().await;
        let reg = fx.subscribe(10, BASIC_PLAN, at(2025, 3, 1, 0, 0)).await;
        let engine = &fx.services.sessions;
        let now = at(2025, 3, 2, 9, 0);

        let err = engine
            .start_verified(&reg.id.to_string(), StartRequest::driver(11, 1, 20), now)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        let err = engine
            .start_verified("not-a-code", StartRequest::driver(10, 1, 20), now)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        engine
            .start_verified(&reg.id.to_string(), StartRequest::driver(10, 1, 20), now)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn employee_start_is_recorded() {
        let fx = Fixture::new().await;
        let s = fx
            .services
            .sessions
            .start(StartRequest::driver(10, 1, 20).by_employee(3), at(2025, 3, 1, 9, 0))
            .await
            .unwrap();
        assert_eq!(s.started_by_employee, Some(3));
        assert_eq!(fx.services.sessions.for_driver(10).await.unwrap().len(), 1);
    }
}
