//! Outbound ports: collaborators the core talks to but does not own
//!
//! - [`Notifier`]: fire-and-forget delivery of reminders and warnings
//! - [`SubscriptionProofVerifier`]: QR proof check ahead of walk-in sessions
//! - [`PaymentConfirmation`]: the verified payment-gateway callback
//!
//! The account service is reached through
//! [`AccountRepository`](crate::domain::AccountRepository).

use async_trait::async_trait;

use crate::domain::{DomainResult, PaymentMethod, PaymentRecord};
use crate::notifications::{Event, EventBus};

// ── Notifier ───────────────────────────────────────────────────

/// Fire-and-forget notification sink.
///
/// Implementations must not block and must swallow (and log) their own
/// failures; billing state transitions never wait on delivery.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: Event);
}

impl Notifier for EventBus {
    fn notify(&self, event: Event) {
        self.publish(event);
    }
}

// ── Subscription proof ─────────────────────────────────────────

/// Result of checking a scanned subscription QR code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionProof {
    pub registration_id: i32,
    pub valid: bool,
}

#[async_trait]
pub trait SubscriptionProofVerifier: Send + Sync {
    async fn verify(&self, code: &str) -> DomainResult<SubscriptionProof>;
}

// ── Payment gateway ────────────────────────────────────────────

/// A payment-gateway callback whose signature has already been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
    pub success: bool,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub reference_id: Option<String>,
    pub amount_paid: i64,
}

impl PaymentConfirmation {
    /// Successful payment of `amount_paid` by `method`.
    pub fn succeeded(method: PaymentMethod, amount_paid: i64) -> Self {
        Self {
            success: true,
            method,
            transaction_id: None,
            reference_id: None,
            amount_paid,
        }
    }

    pub fn with_reference(mut self, transaction_id: impl Into<String>, reference_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn into_record(self) -> PaymentRecord {
        PaymentRecord {
            method: self.method,
            transaction_id: self.transaction_id,
            reference_id: self.reference_id,
            amount_paid: self.amount_paid,
        }
    }
}
