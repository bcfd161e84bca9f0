//! Subscription plans, their benefits and driver registrations

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::shared::errors::DomainError;

/// A modifier a plan grants to cost or fee behaviour
#[derive(Debug, Clone, PartialEq)]
pub enum PlanBenefit {
    /// Percentage off the energy cost
    ChargingDiscount { percent: Decimal },
    /// The per-session fee is not charged
    SessionFeeWaiver,
    /// Free minutes before overuse is charged
    OveruseGraceTime { minutes: i64 },
}

impl PlanBenefit {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChargingDiscount { .. } => "CHARGING_DISCOUNT",
            Self::SessionFeeWaiver => "SESSION_FEE_WAIVER",
            Self::OveruseGraceTime { .. } => "OVERUSE_GRACE_TIME",
        }
    }

    /// Rebuild from the stored `(kind, value)` pair.
    pub fn from_parts(kind: &str, value: Option<&str>) -> Option<Self> {
        match kind {
            "CHARGING_DISCOUNT" => value
                .and_then(|v| v.parse::<Decimal>().ok())
                .map(|percent| Self::ChargingDiscount { percent }),
            "SESSION_FEE_WAIVER" => Some(Self::SessionFeeWaiver),
            "OVERUSE_GRACE_TIME" => value
                .and_then(|v| v.parse::<i64>().ok())
                .map(|minutes| Self::OveruseGraceTime { minutes }),
            _ => None,
        }
    }

    /// Stored value column for this benefit.
    pub fn value(&self) -> Option<String> {
        match self {
            Self::ChargingDiscount { percent } => Some(percent.to_string()),
            Self::SessionFeeWaiver => None,
            Self::OveruseGraceTime { minutes } => Some(minutes.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPlan {
    pub id: i32,
    pub name: String,
    /// Recurring fee added to each invoice, whole currency units
    pub base_fee: i64,
    pub duration_days: i64,
    pub benefits: Vec<PlanBenefit>,
    pub is_active: bool,
}

impl SubscriptionPlan {
    pub fn new(id: i32, name: impl Into<String>, base_fee: i64, duration_days: i64) -> Self {
        Self {
            id,
            name: name.into(),
            base_fee,
            duration_days,
            benefits: Vec::new(),
            is_active: true,
        }
    }

    pub fn with_benefit(mut self, benefit: PlanBenefit) -> Self {
        self.benefits.push(benefit);
        self
    }
}

/// Registration status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Requested, awaiting payment/activation
    Pending,
    Active,
    Expired,
    Cancelled,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "PENDING" => Self::Pending,
            "ACTIVE" => Self::Active,
            "EXPIRED" => Self::Expired,
            _ => Self::Cancelled,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A driver's subscription instance
#[derive(Debug, Clone, PartialEq)]
pub struct PlanRegistration {
    /// Assigned by the repository on insert (0 before that)
    pub id: i32,
    pub driver_id: i32,
    pub plan_id: i32,
    pub status: RegistrationStatus,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PlanRegistration {
    pub fn new(driver_id: i32, plan_id: i32, created_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            driver_id,
            plan_id,
            status: RegistrationStatus::Pending,
            start_date: None,
            end_date: None,
            created_at,
        }
    }

    /// `ACTIVE` and `start_date <= now <= end_date`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.start_date, self.end_date) {
            (RegistrationStatus::Active, Some(start), Some(end)) => start <= now && now <= end,
            _ => false,
        }
    }

    /// Whether the registration was in force at some instant of `[start, end)`,
    /// whatever its status is today.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        match (self.start_date, self.end_date) {
            (Some(from), Some(to)) => from < end && to >= start,
            _ => false,
        }
    }

    pub fn activate(&mut self, now: DateTime<Utc>, duration_days: i64) -> Result<(), DomainError> {
        if self.status != RegistrationStatus::Pending {
            return Err(DomainError::InvalidTransition(format!(
                "registration {} is {}, only PENDING can be activated",
                self.id, self.status
            )));
        }
        let end = Some(duration_days)
            .filter(|days| *days > 0)
            .and_then(Duration::try_days)
            .and_then(|duration| now.checked_add_signed(duration))
            .ok_or_else(|| DomainError::InvalidInput(format!("plan duration {} days", duration_days)))?;
        self.status = RegistrationStatus::Active;
        self.start_date = Some(now);
        self.end_date = Some(end);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), DomainError> {
        match self.status {
            RegistrationStatus::Pending | RegistrationStatus::Active => {
                self.status = RegistrationStatus::Cancelled;
                Ok(())
            }
            other => Err(DomainError::InvalidTransition(format!(
                "registration {} is {}",
                self.id, other
            ))),
        }
    }

    pub fn expire(&mut self) -> Result<(), DomainError> {
        if self.status != RegistrationStatus::Active {
            return Err(DomainError::InvalidTransition(format!(
                "registration {} is {}, only ACTIVE can expire",
                self.id, self.status
            )));
        }
        self.status = RegistrationStatus::Expired;
        Ok(())
    }
}

/// Benefits in force for a driver at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBenefits {
    pub discount_percent: Decimal,
    pub fee_waived: bool,
    pub grace_minutes: i64,
}

impl ResolvedBenefits {
    pub fn none() -> Self {
        Self {
            discount_percent: Decimal::ZERO,
            fee_waived: false,
            grace_minutes: 0,
        }
    }

    /// Fold a plan's benefits; repeated kinds keep the most generous value.
    pub fn from_benefits(benefits: &[PlanBenefit]) -> Self {
        benefits.iter().fold(Self::none(), |mut acc, benefit| {
            match benefit {
                PlanBenefit::ChargingDiscount { percent } => {
                    let percent = (*percent).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
                    acc.discount_percent = acc.discount_percent.max(percent);
                }
                PlanBenefit::SessionFeeWaiver => acc.fee_waived = true,
                PlanBenefit::OveruseGraceTime { minutes } => {
                    acc.grace_minutes = acc.grace_minutes.max((*minutes).max(0));
                }
            }
            acc
        })
    }

    /// `max(0, overuse_minutes - grace_minutes) * per_minute_rate`
    pub fn overuse_fee(&self, overuse_minutes: i64, per_minute_rate: i64) -> i64 {
        (overuse_minutes - self.grace_minutes).max(0) * per_minute_rate
    }
}

impl Default for ResolvedBenefits {
    fn default() -> Self {
        Self::none()
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn benefits_fold_keeps_best_values() {
        let resolved = ResolvedBenefits::from_benefits(&[
            PlanBenefit::ChargingDiscount { percent: Decimal::from(10) },
            PlanBenefit::ChargingDiscount { percent: Decimal::from(15) },
            PlanBenefit::OveruseGraceTime { minutes: 20 },
            PlanBenefit::SessionFeeWaiver,
        ]);
        assert_eq!(resolved.discount_percent, Decimal::from(15));
        assert!(resolved.fee_waived);
        assert_eq!(resolved.grace_minutes, 20);
    }

    #[test]
    fn overuse_fee_subtracts_grace() {
        let resolved = ResolvedBenefits {
            grace_minutes: 15,
            ..ResolvedBenefits::none()
        };
        assert_eq!(resolved.overuse_fee(10, 1000), 0);
        assert_eq!(resolved.overuse_fee(25, 1000), 10_000);
        assert_eq!(ResolvedBenefits::none().overuse_fee(3, 500), 1500);
    }

    #[test]
    fn registration_lifecycle() {
        let mut reg = PlanRegistration::new(1, 2, day(1));
        assert!(!reg.is_valid_at(day(1)));

        reg.activate(day(1), 30).unwrap();
        assert_eq!(reg.end_date, Some(day(31)));
        assert!(reg.is_valid_at(day(1)));
        assert!(reg.is_valid_at(day(31)));
        assert!(!reg.is_valid_at(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));

        assert!(matches!(reg.activate(day(2), 30), Err(DomainError::InvalidTransition(_))));
        reg.expire().unwrap();
        assert!(matches!(reg.cancel(), Err(DomainError::InvalidTransition(_))));
    }

    #[test]
    fn activation_rejects_unrepresentable_duration() {
        for days in [0, -3, i64::MAX / 2, 1_000_000_000] {
            let mut reg = PlanRegistration::new(1, 2, day(1));
            assert!(matches!(reg.activate(day(1), days), Err(DomainError::InvalidInput(_))));
            assert_eq!(reg.status, RegistrationStatus::Pending);
            assert_eq!(reg.end_date, None);
        }
    }

    #[test]
    fn overlap_ignores_current_status() {
        let mut reg = PlanRegistration::new(1, 2, day(1));
        assert!(!reg.overlaps(day(1), day(31)));

        reg.activate(day(10), 5).unwrap();
        reg.expire().unwrap();
        assert!(reg.overlaps(day(1), day(11)));
        assert!(reg.overlaps(day(15), day(20)));
        assert!(!reg.overlaps(day(16), day(20)));
        assert!(!reg.overlaps(day(1), day(10)));
    }

    #[test]
    fn benefit_storage_parts() {
        let b = PlanBenefit::ChargingDiscount { percent: Decimal::new(125, 1) };
        let value = b.value();
        assert_eq!(PlanBenefit::from_parts(b.kind(), value.as_deref()), Some(b));
        assert_eq!(
            PlanBenefit::from_parts("SESSION_FEE_WAIVER", None),
            Some(PlanBenefit::SessionFeeWaiver)
        );
        assert_eq!(PlanBenefit::from_parts("OVERUSE_GRACE_TIME", Some("x")), None);
    }
}
