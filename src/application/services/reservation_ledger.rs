//! Time-interval holds on charging points
//!
//! A reservation starts at creation time, so creating one also moves the
//! point to `booked`; cancellation and expiry release the hold. The overlap
//! check and the insert run under the per-point admission lock shared with
//! the session engine.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::application::ports::Notifier;
use crate::application::report::JobReport;
use crate::domain::{DomainError, DomainResult, RepositoryProvider, Reservation};
use crate::notifications::{Event, ReservationExpiredEvent};
use crate::shared::AdmissionLocks;

use super::ResourceRegistry;

pub struct ReservationLedger {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<ResourceRegistry>,
    locks: Arc<AdmissionLocks>,
    notifier: Arc<dyn Notifier>,
}

impl ReservationLedger {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        registry: Arc<ResourceRegistry>,
        locks: Arc<AdmissionLocks>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            repos,
            registry,
            locks,
            notifier,
        }
    }

    /// Reserve `point_id` for `[now, now + duration_minutes)`.
    pub async fn create(
        &self,
        driver_id: i32,
        point_id: i32,
        vehicle_id: Option<i32>,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        let duration = Duration::try_minutes(duration_minutes).ok_or_else(|| {
            DomainError::InvalidInput(format!("reservation duration {} minutes", duration_minutes))
        })?;
        let candidate = Reservation::new(driver_id, point_id, vehicle_id, now, duration)?;

        let _point = self.locks.points.lock(point_id).await;

        let active = self.repos.reservations().find_active_for_point(point_id).await?;
        if let Some(existing) = active
            .iter()
            .find(|r| r.overlaps(candidate.start_time, candidate.end_time))
        {
            return Err(DomainError::Conflict(format!(
                "point {} already reserved by reservation {} until {}",
                point_id, existing.id, existing.end_time
            )));
        }

        self.registry.hold(point_id).await?;
        let reservation = match self.repos.reservations().insert(candidate).await {
            Ok(r) => r,
            Err(e) => {
                if let Err(release) = self.registry.release_hold(point_id).await {
                    warn!(point_id, error = %release, "Failed to release hold after insert error");
                }
                return Err(e);
            }
        };

        info!(
            reservation_id = reservation.id,
            driver_id,
            point_id,
            end_time = %reservation.end_time,
            "Reservation created"
        );
        Ok(reservation)
    }

    /// `ACTIVE → CANCELLED`; any other status is an `InvalidTransition`.
    pub async fn cancel(&self, reservation_id: i32) -> DomainResult<Reservation> {
        let reservation = self.get(reservation_id).await?;
        let _point = self.locks.points.lock(reservation.point_id).await;

        let mut reservation = self.get(reservation_id).await?;
        reservation.cancel()?;
        self.repos.reservations().update(reservation.clone()).await?;
        self.release_if_unheld(reservation.point_id).await?;

        info!(reservation_id, point_id = reservation.point_id, "Reservation cancelled");
        Ok(reservation)
    }

    /// Expire every `ACTIVE` reservation whose end time has passed.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> DomainResult<JobReport> {
        let started = Instant::now();
        let mut report = JobReport::new("reservation_expiry");

        for stale in self.repos.reservations().find_expired(now).await? {
            match self.expire_one(stale.id, now).await {
                Ok(true) => report.success(),
                Ok(false) => report.skip(),
                Err(e) => report.failure(format!("reservation {}", stale.id), &e),
            }
        }
        Ok(report.finish(started))
    }

    /// The requester-agnostic `ACTIVE` reservation covering `at`, if any.
    pub async fn covering(&self, point_id: i32, at: DateTime<Utc>) -> DomainResult<Option<Reservation>> {
        Ok(self
            .repos
            .reservations()
            .find_active_for_point(point_id)
            .await?
            .into_iter()
            .find(|r| r.covers(at)))
    }

    /// Mark a reservation as used by a session. The caller holds the point lock.
    pub(crate) async fn consume(&self, mut reservation: Reservation) -> DomainResult<Reservation> {
        reservation.complete()?;
        self.repos.reservations().update(reservation.clone()).await?;
        Ok(reservation)
    }

    pub async fn find(&self, reservation_id: i32) -> DomainResult<Option<Reservation>> {
        self.repos.reservations().find_by_id(reservation_id).await
    }

    /// Reservation history of a driver, newest first.
    pub async fn for_driver(&self, driver_id: i32) -> DomainResult<Vec<Reservation>> {
        self.repos.reservations().find_for_driver(driver_id).await
    }

    async fn expire_one(&self, reservation_id: i32, now: DateTime<Utc>) -> DomainResult<bool> {
        let reservation = self.get(reservation_id).await?;
        let _point = self.locks.points.lock(reservation.point_id).await;

        // Re-read under the lock: a session may have consumed it meanwhile.
        let mut reservation = self.get(reservation_id).await?;
        if !reservation.is_overdue(now) {
            return Ok(false);
        }
        reservation.expire()?;
        self.repos.reservations().update(reservation.clone()).await?;
        self.release_if_unheld(reservation.point_id).await?;

        self.notifier.notify(Event::ReservationExpired(ReservationExpiredEvent {
            reservation_id,
            driver_id: reservation.driver_id,
            point_id: reservation.point_id,
            timestamp: now,
        }));
        Ok(true)
    }

    async fn release_if_unheld(&self, point_id: i32) -> DomainResult<()> {
        let still_held = !self
            .repos
            .reservations()
            .find_active_for_point(point_id)
            .await?
            .is_empty();
        if !still_held {
            self.registry.release_hold(point_id).await?;
        }
        Ok(())
    }

    async fn get(&self, reservation_id: i32) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", reservation_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::fixtures::{at, Fixture};
    use crate::domain::{ReservationStatus, ResourceRef, ResourceStatus};

    #[tokio::test]
    async fn create_books_the_point() {
        let fx = Fixture::new().await;
        let ledger = &fx.services.reservations;

        let r = ledger.create(10, 1, Some(100), 30, at(2025, 3, 1, 10, 0)).await.unwrap();
        assert_eq!(r.status, ReservationStatus::Active);
        assert_eq!(r.start_time, at(2025, 3, 1, 10, 0));
        assert_eq!(r.end_time, at(2025, 3, 1, 10, 30));
        assert_eq!(
            fx.services.registry.status_of(ResourceRef::Point(1)).await.unwrap(),
            ResourceStatus::Booked
        );
    }

    #[tokio::test]
    async fn overlapping_reservation_conflicts() {
        let fx = Fixture::new().await;
        let ledger = &fx.services.reservations;

        ledger.create(10, 1, None, 30, at(2025, 3, 1, 10, 0)).await.unwrap();
        let err = ledger.create(11, 1, None, 30, at(2025, 3, 1, 10, 15)).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Other points are unaffected.
        ledger.create(11, 2, None, 30, at(2025, 3, 1, 10, 15)).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_creates_admit_one() {
        let fx = Fixture::new().await;
        let now = at(2025, 3, 1, 10, 0);

        let a = {
            let ledger = Arc::clone(&fx.services.reservations);
            tokio::spawn(async move { ledger.create(10, 1, None, 30, now).await })
        };
        let b = {
            let ledger = Arc::clone(&fx.services.reservations);
            tokio::spawn(async move { ledger.create(11, 1, None, 30, now).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(fx.repos.reservations().find_active_for_point(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_point_refused() {
        let fx = Fixture::new().await;
        fx.services
            .registry
            .set_status(ResourceRef::Point(1), ResourceStatus::Maintenance)
            .await
            .unwrap();
        let err = fx
            .services
            .reservations
            .create(10, 1, None, 30, at(2025, 3, 1, 10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ResourceUnavailable(_)));
    }

    #[tokio::test]
    async fn zero_duration_is_invalid() {
        let fx = Fixture::new().await;
        let err = fx
            .services
            .reservations
            .create(10, 1, None, 0, at(2025, 3, 1, 10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn out_of_range_duration_is_invalid() {
        let fx = Fixture::new().await;
        let now = at(2025, 3, 1, 10, 0);
        for minutes in [i64::MAX / 2, i64::MAX, 60 * 24 * 365 * 1_000_000] {
            let err = fx
                .services
                .reservations
                .create(10, 1, None, minutes, now)
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)), "{} minutes: {:?}", minutes, err);
        }
        assert!(fx.services.reservations.for_driver(10).await.unwrap().is_empty());

        // The point was never held.
        fx.services.reservations.create(11, 1, None, 30, now).await.unwrap();
    }

    #[tokio::test]
    async fn cancel_releases_point_once() {
        let fx = Fixture::new().await;
        let ledger = &fx.services.reservations;

        let r = ledger.create(10, 1, None, 30, at(2025, 3, 1, 10, 0)).await.unwrap();
        let cancelled = ledger.cancel(r.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(
            fx.services.registry.status_of(ResourceRef::Point(1)).await.unwrap(),
            ResourceStatus::Active
        );

        let err = ledger.cancel(r.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn sweep_expires_only_past_end() {
        let fx = Fixture::new().await;
        let ledger = &fx.services.reservations;

        let early = ledger.create(10, 1, None, 30, at(2025, 3, 1, 10, 0)).await.unwrap();
        let late = ledger.create(11, 2, None, 120, at(2025, 3, 1, 10, 0)).await.unwrap();

        let report = ledger.sweep_expired(at(2025, 3, 1, 10, 45)).await.unwrap();
        assert_eq!(report.succeeded, 1);

        let early = ledger.find(early.id).await.unwrap().unwrap();
        let late = ledger.find(late.id).await.unwrap().unwrap();
        assert_eq!(early.status, ReservationStatus::Expired);
        assert_eq!(late.status, ReservationStatus::Active);
        assert_eq!(
            fx.services.registry.status_of(ResourceRef::Point(1)).await.unwrap(),
            ResourceStatus::Active
        );
        assert_eq!(fx.notifier.count("reservation_expired"), 1);

        // Second sweep finds nothing new.
        let again = ledger.sweep_expired(at(2025, 3, 1, 10, 50)).await.unwrap();
        assert_eq!(again.processed, 0);
    }

    #[tokio::test]
    async fn driver_history_newest_first() {
        let fx = Fixture::new().await;
        let ledger = &fx.services.reservations;

        let first = ledger.create(10, 1, None, 30, at(2025, 3, 1, 10, 0)).await.unwrap();
        ledger.cancel(first.id).await.unwrap();
        let second = ledger.create(10, 1, None, 30, at(2025, 3, 1, 11, 0)).await.unwrap();

        let history = ledger.for_driver(10).await.unwrap();
        assert_eq!(history.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    }
}
