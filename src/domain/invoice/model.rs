//! Invoice domain entities

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::shared::errors::DomainError;

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Unpaid,
    Overdue,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "unpaid" => Self::Unpaid,
            "overdue" => Self::Overdue,
            "paid" => Self::Paid,
            _ => Self::Cancelled,
        }
    }

    /// Still owed: unpaid or overdue
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Unpaid | Self::Overdue)
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    Vnpay,
    Cash,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vnpay => "VNPAY",
            Self::Cash => "CASH",
            Self::BankTransfer => "BANK_TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "VNPAY" => Some(Self::Vnpay),
            "CASH" => Some(Self::Cash),
            "BANK_TRANSFER" => Some(Self::BankTransfer),
            _ => None,
        }
    }
}

/// What was recorded when an invoice was settled
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRecord {
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub reference_id: Option<String>,
    pub amount_paid: i64,
}

/// Half-open billing window `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BillingPeriod {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if start >= end {
            return Err(DomainError::InvalidInput(format!(
                "billing period start {} not before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month (UTC) containing `at`.
    pub fn month_of(at: DateTime<Utc>) -> Self {
        let first = first_of_month(at.year(), at.month());
        let (ny, nm) = if at.month() == 12 {
            (at.year() + 1, 1)
        } else {
            (at.year(), at.month() + 1)
        };
        Self {
            start: first,
            end: first_of_month(ny, nm),
        }
    }

    /// The calendar month before the one containing `now`.
    pub fn previous_month(now: DateTime<Utc>) -> Self {
        let current = Self::month_of(now);
        Self::month_of(current.start - Duration::days(1))
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn first_of_month(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// Driver invoice aggregating completed sessions
#[derive(Debug, Clone, PartialEq)]
pub struct Invoice {
    /// Assigned by the repository on insert (0 before that)
    pub id: i32,
    pub driver_id: i32,
    /// Plan registration whose base fee is included, if any
    pub registration_id: Option<i32>,
    pub period: BillingPeriod,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    /// Sum of session amounts
    pub sessions_total: i64,
    pub plan_fee: i64,
    pub total_cost: i64,
    pub status: InvoiceStatus,
    pub session_ids: Vec<i32>,
    pub payment: Option<PaymentRecord>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// New unpaid invoice due `due_in` after `issue_date`.
    pub fn issue(
        driver_id: i32,
        period: BillingPeriod,
        sessions_total: i64,
        plan_fee: i64,
        session_ids: Vec<i32>,
        issue_date: DateTime<Utc>,
        due_in: Duration,
    ) -> Self {
        Self {
            id: 0,
            driver_id,
            registration_id: None,
            period,
            issue_date,
            due_date: issue_date + due_in,
            paid_date: None,
            sessions_total,
            plan_fee,
            total_cost: sessions_total + plan_fee,
            status: InvoiceStatus::Unpaid,
            session_ids,
            payment: None,
            reminder_sent_at: None,
            updated_at: issue_date,
        }
    }

    pub fn is_outstanding(&self) -> bool {
        self.status.is_outstanding()
    }

    /// Unpaid and past its due date.
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.status == InvoiceStatus::Unpaid && self.due_date < now
    }

    /// Outstanding and past the end of the grace period.
    pub fn is_past_grace(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.is_outstanding() && self.due_date + grace < now
    }

    pub fn mark_overdue(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status != InvoiceStatus::Unpaid {
            return Err(DomainError::InvalidTransition(format!(
                "invoice {} is {}, only unpaid can become overdue",
                self.id, self.status
            )));
        }
        self.status = InvoiceStatus::Overdue;
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_paid(&mut self, payment: PaymentRecord, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_outstanding() {
            return Err(DomainError::InvalidTransition(format!(
                "invoice {} is {}",
                self.id, self.status
            )));
        }
        self.status = InvoiceStatus::Paid;
        self.paid_date = Some(now);
        self.payment = Some(payment);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.is_outstanding() {
            return Err(DomainError::InvalidTransition(format!(
                "invoice {} is {}",
                self.id, self.status
            )));
        }
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}

/// One vehicle's share of an enterprise invoice
#[derive(Debug, Clone, PartialEq)]
pub struct EnterpriseLineItem {
    pub vehicle_id: i32,
    pub session_count: i32,
    pub kwh_used: Decimal,
    pub amount: i64,
}

/// Post-paid consolidated invoice for an enterprise fleet
#[derive(Debug, Clone, PartialEq)]
pub struct EnterpriseInvoice {
    pub id: i32,
    pub enterprise_id: i32,
    pub period: BillingPeriod,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub total_cost: i64,
    pub status: InvoiceStatus,
    pub lines: Vec<EnterpriseLineItem>,
    pub session_ids: Vec<i32>,
    pub payment: Option<PaymentRecord>,
}

impl EnterpriseInvoice {
    pub fn issue(
        enterprise_id: i32,
        period: BillingPeriod,
        lines: Vec<EnterpriseLineItem>,
        session_ids: Vec<i32>,
        issue_date: DateTime<Utc>,
        due_in: Duration,
    ) -> Self {
        let total_cost = lines.iter().map(|l| l.amount).sum();
        Self {
            id: 0,
            enterprise_id,
            period,
            issue_date,
            due_date: issue_date + due_in,
            paid_date: None,
            total_cost,
            status: InvoiceStatus::Unpaid,
            lines,
            session_ids,
            payment: None,
        }
    }

    pub fn mark_paid(&mut self, payment: PaymentRecord, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.is_outstanding() {
            return Err(DomainError::InvalidTransition(format!(
                "enterprise invoice {} is {}",
                self.id, self.status
            )));
        }
        self.status = InvoiceStatus::Paid;
        self.paid_date = Some(now);
        self.payment = Some(payment);
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap()
    }

    fn sample_invoice() -> Invoice {
        Invoice::issue(
            1,
            BillingPeriod::previous_month(jan(1)),
            90_000,
            50_000,
            vec![1, 2],
            jan(1),
            Duration::days(7),
        )
    }

    fn payment() -> PaymentRecord {
        PaymentRecord {
            method: PaymentMethod::Vnpay,
            transaction_id: Some("TX1".into()),
            reference_id: Some("REF1".into()),
            amount_paid: 140_000,
        }
    }

    #[test]
    fn due_date_is_seven_days_after_issue() {
        let inv = sample_invoice();
        assert_eq!(inv.due_date, jan(8));
        assert_eq!(inv.total_cost, 140_000);
        assert_eq!(inv.status, InvoiceStatus::Unpaid);
    }

    #[test]
    fn past_due_and_grace_windows() {
        let inv = sample_invoice();
        assert!(!inv.is_past_due(jan(8)));
        assert!(inv.is_past_due(jan(9)));
        assert!(!inv.is_past_grace(jan(15), Duration::days(7)));
        assert!(inv.is_past_grace(jan(16), Duration::days(7)));
    }

    #[test]
    fn paid_invoice_is_immutable() {
        let mut inv = sample_invoice();
        inv.mark_paid(payment(), jan(3)).unwrap();
        let snapshot = inv.clone();

        assert!(matches!(inv.mark_paid(payment(), jan(4)), Err(DomainError::InvalidTransition(_))));
        assert!(matches!(inv.mark_overdue(jan(9)), Err(DomainError::InvalidTransition(_))));
        assert!(matches!(inv.cancel(jan(9)), Err(DomainError::InvalidTransition(_))));
        assert_eq!(inv, snapshot);
    }

    #[test]
    fn overdue_invoice_can_still_be_paid() {
        let mut inv = sample_invoice();
        inv.mark_overdue(jan(9)).unwrap();
        inv.mark_paid(payment(), jan(20)).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.paid_date, Some(jan(20)));
    }

    #[test]
    fn previous_month_period() {
        let p = BillingPeriod::previous_month(Utc.with_ymd_and_hms(2025, 3, 1, 2, 0, 0).unwrap());
        assert_eq!(p.start, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(p.end, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());

        let dec = BillingPeriod::previous_month(jan(15));
        assert_eq!(dec.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());
        assert_eq!(dec.end, jan(1));
        assert!(dec.contains(Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()));
        assert!(!dec.contains(jan(1)));
    }

    #[test]
    fn empty_period_rejected() {
        assert!(matches!(BillingPeriod::new(jan(2), jan(2)), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn enterprise_total_sums_lines() {
        let lines = vec![
            EnterpriseLineItem {
                vehicle_id: 1,
                session_count: 2,
                kwh_used: Decimal::from(40),
                amount: 80_000,
            },
            EnterpriseLineItem {
                vehicle_id: 2,
                session_count: 1,
                kwh_used: Decimal::from(10),
                amount: 20_000,
            },
        ];
        let inv = EnterpriseInvoice::issue(
            3,
            BillingPeriod::month_of(jan(1)),
            lines,
            vec![4, 5, 6],
            jan(31),
            Duration::days(7),
        );
        assert_eq!(inv.total_cost, 100_000);
    }
}
