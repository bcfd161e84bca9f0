//! Charging session domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::shared::errors::DomainError;

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Energy is being delivered
    Charging,
    /// Stopped normally and priced
    Completed,
    /// Aborted; no charge
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charging => "CHARGING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "CHARGING" => Self::Charging,
            "COMPLETED" => Self::Completed,
            _ => Self::Cancelled,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who is billed for a session: a driver, or an enterprise fleet vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOwner {
    Driver { driver_id: i32 },
    Enterprise { enterprise_id: i32, vehicle_id: i32 },
}

impl SessionOwner {
    pub fn driver_id(&self) -> Option<i32> {
        match *self {
            Self::Driver { driver_id } => Some(driver_id),
            Self::Enterprise { .. } => None,
        }
    }

    pub fn enterprise_id(&self) -> Option<i32> {
        match *self {
            Self::Enterprise { enterprise_id, .. } => Some(enterprise_id),
            Self::Driver { .. } => None,
        }
    }

    pub fn vehicle_id(&self) -> Option<i32> {
        match *self {
            Self::Enterprise { vehicle_id, .. } => Some(vehicle_id),
            Self::Driver { .. } => None,
        }
    }
}

impl std::fmt::Display for SessionOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Driver { driver_id } => write!(f, "driver#{}", driver_id),
            Self::Enterprise {
                enterprise_id,
                vehicle_id,
            } => write!(f, "enterprise#{}/vehicle#{}", enterprise_id, vehicle_id),
        }
    }
}

/// Outcome of pricing a stopped session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCharge {
    pub end_percentage: i32,
    pub kwh_used: Decimal,
    pub cost: i64,
    pub overuse_fee: i64,
    pub discount_percent: Decimal,
    pub fee_waived: bool,
    pub ended_by_employee: Option<i32>,
}

/// One charge-delivery event on a charging point
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingSession {
    /// Assigned by the repository on insert (0 before that)
    pub id: i32,
    pub owner: SessionOwner,
    pub point_id: i32,
    /// Reservation consumed by this session, if any
    pub reservation_id: Option<i32>,
    pub status: SessionStatus,
    pub start_percentage: i32,
    pub end_percentage: Option<i32>,
    pub kwh_used: Decimal,
    /// Energy cost after discount, whole currency units
    pub cost: i64,
    /// Charge for running past the consumed reservation
    pub overuse_fee: i64,
    /// Discount applied at stop time (audit)
    pub discount_percent: Decimal,
    /// The per-session fee is waived by the driver's plan
    pub fee_waived: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub started_by_employee: Option<i32>,
    pub ended_by_employee: Option<i32>,
    pub invoice_id: Option<i32>,
    pub enterprise_invoice_id: Option<i32>,
}

impl ChargingSession {
    pub fn new(
        owner: SessionOwner,
        point_id: i32,
        start_percentage: i32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            owner,
            point_id,
            reservation_id: None,
            status: SessionStatus::Charging,
            start_percentage,
            end_percentage: None,
            kwh_used: Decimal::ZERO,
            cost: 0,
            overuse_fee: 0,
            discount_percent: Decimal::ZERO,
            fee_waived: false,
            started_at,
            ended_at: None,
            started_by_employee: None,
            ended_by_employee: None,
            invoice_id: None,
            enterprise_invoice_id: None,
        }
    }

    pub fn is_charging(&self) -> bool {
        self.status == SessionStatus::Charging
    }

    pub fn complete(&mut self, charge: SessionCharge, ended_at: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_charging("complete")?;
        self.status = SessionStatus::Completed;
        self.end_percentage = Some(charge.end_percentage);
        self.kwh_used = charge.kwh_used;
        self.cost = charge.cost;
        self.overuse_fee = charge.overuse_fee;
        self.discount_percent = charge.discount_percent;
        self.fee_waived = charge.fee_waived;
        self.ended_by_employee = charge.ended_by_employee;
        self.ended_at = Some(ended_at);
        Ok(())
    }

    pub fn cancel(&mut self, ended_at: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_charging("cancel")?;
        self.status = SessionStatus::Cancelled;
        self.cost = 0;
        self.ended_at = Some(ended_at);
        Ok(())
    }

    /// Amount this session contributes to an invoice.
    pub fn billable_amount(&self, session_fee: i64) -> i64 {
        let fee = if self.fee_waived { 0 } else { session_fee };
        self.cost + self.overuse_fee + fee
    }

    pub fn is_billed(&self) -> bool {
        self.invoice_id.is_some() || self.enterprise_invoice_id.is_some()
    }

    fn ensure_charging(&self, action: &str) -> Result<(), DomainError> {
        if !self.is_charging() {
            return Err(DomainError::InvalidTransition(format!(
                "cannot {} session {} in status {}",
                action, self.id, self.status
            )));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> ChargingSession {
        ChargingSession::new(SessionOwner::Driver { driver_id: 1 }, 10, 20, Utc::now())
    }

    fn charge(cost: i64, waived: bool) -> SessionCharge {
        SessionCharge {
            end_percentage: 80,
            kwh_used: Decimal::from(30),
            cost,
            overuse_fee: 0,
            discount_percent: Decimal::ZERO,
            fee_waived: waived,
            ended_by_employee: None,
        }
    }

    #[test]
    fn new_session_is_charging_with_zero_cost() {
        let s = sample_session();
        assert!(s.is_charging());
        assert_eq!(s.cost, 0);
        assert_eq!(s.kwh_used, Decimal::ZERO);
        assert!(s.ended_at.is_none());
    }

    #[test]
    fn complete_records_charge() {
        let mut s = sample_session();
        s.complete(charge(90_000, false), Utc::now()).unwrap();
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.end_percentage, Some(80));
        assert_eq!(s.cost, 90_000);
        assert!(s.ended_at.is_some());
    }

    #[test]
    fn terminal_states_reject_changes() {
        let mut s = sample_session();
        s.cancel(Utc::now()).unwrap();
        assert_eq!(s.status, SessionStatus::Cancelled);
        assert!(matches!(s.cancel(Utc::now()), Err(DomainError::InvalidTransition(_))));
        assert!(matches!(
            s.complete(charge(1, false), Utc::now()),
            Err(DomainError::InvalidTransition(_))
        ));
    }

    #[test]
    fn billable_amount_respects_waiver() {
        let mut s = sample_session();
        s.complete(charge(1000, false), Utc::now()).unwrap();
        assert_eq!(s.billable_amount(500), 1500);

        let mut waived = sample_session();
        waived.complete(charge(1000, true), Utc::now()).unwrap();
        assert_eq!(waived.billable_amount(500), 1000);
    }

    #[test]
    fn owner_accessors() {
        let owner = SessionOwner::Enterprise {
            enterprise_id: 4,
            vehicle_id: 9,
        };
        assert_eq!(owner.driver_id(), None);
        assert_eq!(owner.enterprise_id(), Some(4));
        assert_eq!(owner.vehicle_id(), Some(9));
        assert_eq!(owner.to_string(), "enterprise#4/vehicle#9");
    }
}
