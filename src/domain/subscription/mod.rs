//! Subscription aggregate

pub mod model;
pub mod repository;

pub use model::{
    PlanBenefit, PlanRegistration, RegistrationStatus, ResolvedBenefits, SubscriptionPlan,
};
pub use repository::SubscriptionRepository;
