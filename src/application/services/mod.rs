//! Application services
//!
//! Leaf to root: the resource registry, the reservation ledger, the benefit
//! resolver, the session engine and the billing engine. Plan registration
//! sits beside them.

mod benefit_resolver;
mod billing_engine;
mod plan_registration;
mod proof_verifier;
mod reservation_ledger;
mod resource_registry;
mod session_engine;

#[cfg(test)]
pub(crate) mod fixtures;

pub use benefit_resolver::BenefitResolver;
pub use billing_engine::{BillingEngine, BillingPolicy};
pub use plan_registration::PlanRegistrationService;
pub use proof_verifier::RegistrationProofVerifier;
pub use reservation_ledger::ReservationLedger;
pub use resource_registry::ResourceRegistry;
pub use session_engine::{PricingPolicy, SessionEngine, StartRequest};
