//! Reservation domain entity

use chrono::{DateTime, Duration, Utc};

use crate::shared::errors::DomainError;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Holding the point
    Active,
    /// Cancelled by the driver
    Cancelled,
    /// Consumed by a charging session
    Completed,
    /// Ran past its end time without being used
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
            Self::Expired => "EXPIRED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "ACTIVE" => Self::Active,
            "COMPLETED" => Self::Completed,
            "EXPIRED" => Self::Expired,
            _ => Self::Cancelled,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Time-interval hold of a charging point by a driver.
///
/// The interval is half-open: `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    /// Assigned by the repository on insert (0 before that)
    pub id: i32,
    pub driver_id: i32,
    pub point_id: i32,
    pub vehicle_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        driver_id: i32,
        point_id: i32,
        vehicle_id: Option<i32>,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Self, DomainError> {
        if duration <= Duration::zero() {
            return Err(DomainError::InvalidInput(format!(
                "reservation duration {} minutes",
                duration.num_minutes()
            )));
        }
        let end_time = start_time
            .checked_add_signed(duration)
            .ok_or_else(|| DomainError::InvalidInput("reservation ends out of range".into()))?;
        Ok(Self {
            id: 0,
            driver_id,
            point_id,
            vehicle_id,
            start_time,
            end_time,
            status: ReservationStatus::Active,
            created_at: start_time,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    /// `existing.start < new_end && existing.end > new_start`
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && self.end_time > start
    }

    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start_time <= at && at < self.end_time
    }

    /// Active and already past its end time.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.end_time < now
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.leave_active(ReservationStatus::Cancelled)
    }

    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.leave_active(ReservationStatus::Completed)
    }

    pub fn expire(&mut self) -> Result<(), DomainError> {
        self.leave_active(ReservationStatus::Expired)
    }

    fn leave_active(&mut self, next: ReservationStatus) -> Result<(), DomainError> {
        if !self.is_active() {
            return Err(DomainError::InvalidTransition(format!(
                "reservation {} is {}, cannot become {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    fn sample_reservation() -> Reservation {
        Reservation::new(7, 1, Some(3), at(10, 0), Duration::minutes(30)).unwrap()
    }

    #[test]
    fn empty_or_unbounded_duration_rejected() {
        for duration in [Duration::zero(), Duration::minutes(-5), Duration::days(1_000_000_000)] {
            let err = Reservation::new(7, 1, None, at(10, 0), duration).unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)));
        }
    }

    #[test]
    fn new_reservation_is_active() {
        let r = sample_reservation();
        assert!(r.is_active());
        assert_eq!(r.end_time, at(10, 30));
        assert_eq!(r.status, ReservationStatus::Active);
    }

    #[test]
    fn overlap_is_half_open() {
        let r = sample_reservation();
        assert!(r.overlaps(at(10, 29), at(11, 0)));
        assert!(r.overlaps(at(9, 0), at(10, 1)));
        assert!(!r.overlaps(at(10, 30), at(11, 0)));
        assert!(!r.overlaps(at(9, 0), at(10, 0)));
    }

    #[test]
    fn covers_start_but_not_end() {
        let r = sample_reservation();
        assert!(r.covers(at(10, 0)));
        assert!(!r.covers(at(10, 30)));
    }

    #[test]
    fn cancel_only_from_active() {
        let mut r = sample_reservation();
        r.cancel().unwrap();
        assert_eq!(r.status, ReservationStatus::Cancelled);
        assert!(matches!(r.cancel(), Err(DomainError::InvalidTransition(_))));
        assert!(matches!(r.complete(), Err(DomainError::InvalidTransition(_))));
    }

    #[test]
    fn overdue_only_while_active() {
        let mut r = sample_reservation();
        assert!(!r.is_overdue(at(10, 30)));
        assert!(r.is_overdue(at(10, 31)));
        r.expire().unwrap();
        assert!(!r.is_overdue(at(10, 31)));
    }

    #[test]
    fn unknown_status_defaults_to_cancelled() {
        assert_eq!(ReservationStatus::from_str("Accepted"), ReservationStatus::Cancelled);
        assert_eq!(ReservationStatus::from_str("EXPIRED"), ReservationStatus::Expired);
    }
}
