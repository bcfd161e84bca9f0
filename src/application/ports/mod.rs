//! Application ports (hexagonal architecture boundaries)
//!
//! Repository traits live in `domain`; the collaborators that are not
//! storage live here.

pub mod outbound;

pub use outbound::{Notifier, PaymentConfirmation, SubscriptionProof, SubscriptionProofVerifier};
