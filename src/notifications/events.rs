//! Notification events
//!
//! Everything the core tells the outside world about: reminders and
//! warnings for drivers, session and reservation milestones for operators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event types for notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    SessionStarted(SessionStartedEvent),
    SessionCompleted(SessionCompletedEvent),
    ReservationExpired(ReservationExpiredEvent),
    InvoiceIssued(InvoiceIssuedEvent),
    /// Reminder ahead of the due date
    InvoiceDueSoon(InvoiceNoticeEvent),
    /// Warning: due date passed, grace period running
    InvoiceOverdue(InvoiceNoticeEvent),
    InvoicePaid(InvoicePaidEvent),
    AccountSuspended(AccountStatusEvent),
    AccountReactivated(AccountStatusEvent),
}

impl Event {
    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::SessionStarted(_) => "session_started",
            Event::SessionCompleted(_) => "session_completed",
            Event::ReservationExpired(_) => "reservation_expired",
            Event::InvoiceIssued(_) => "invoice_issued",
            Event::InvoiceDueSoon(_) => "invoice_due_soon",
            Event::InvoiceOverdue(_) => "invoice_overdue",
            Event::InvoicePaid(_) => "invoice_paid",
            Event::AccountSuspended(_) => "account_suspended",
            Event::AccountReactivated(_) => "account_reactivated",
        }
    }

    /// Driver the event concerns, if any
    pub fn driver_id(&self) -> Option<i32> {
        match self {
            Event::SessionStarted(e) => e.driver_id,
            Event::SessionCompleted(e) => e.driver_id,
            Event::ReservationExpired(e) => Some(e.driver_id),
            Event::InvoiceIssued(e) => e.driver_id,
            Event::InvoiceDueSoon(e) | Event::InvoiceOverdue(e) => Some(e.driver_id),
            Event::InvoicePaid(e) => e.driver_id,
            Event::AccountSuspended(e) | Event::AccountReactivated(e) => Some(e.driver_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartedEvent {
    pub session_id: i32,
    pub point_id: i32,
    pub driver_id: Option<i32>,
    pub enterprise_id: Option<i32>,
    pub reservation_id: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCompletedEvent {
    pub session_id: i32,
    pub point_id: i32,
    pub driver_id: Option<i32>,
    /// Decimal kWh rendered as text
    pub kwh_used: String,
    pub cost: i64,
    pub overuse_fee: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationExpiredEvent {
    pub reservation_id: i32,
    pub driver_id: i32,
    pub point_id: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceIssuedEvent {
    pub invoice_id: i32,
    pub driver_id: Option<i32>,
    pub enterprise_id: Option<i32>,
    pub total_cost: i64,
    pub due_date: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceNoticeEvent {
    pub invoice_id: i32,
    pub driver_id: i32,
    pub total_cost: i64,
    pub due_date: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePaidEvent {
    pub invoice_id: i32,
    pub driver_id: Option<i32>,
    pub enterprise_id: Option<i32>,
    pub amount_paid: i64,
    pub method: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatusEvent {
    pub driver_id: i32,
    /// Invoice that triggered the change
    pub invoice_id: i32,
    pub timestamp: DateTime<Utc>,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_type_tag() {
        let msg = EventMessage::new(Event::AccountSuspended(AccountStatusEvent {
            driver_id: 5,
            invoice_id: 9,
            timestamp: Utc::now(),
        }));
        let json = msg.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "AccountSuspended");
        assert_eq!(value["data"]["driver_id"], 5);
        assert_eq!(msg.event.event_type(), "account_suspended");
        assert_eq!(msg.event.driver_id(), Some(5));
    }
}
