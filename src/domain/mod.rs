//! Domain layer
//!
//! One module per aggregate (entity + repository trait), plus the
//! `RepositoryProvider` that gathers the repositories.

pub mod account;
pub mod invoice;
pub mod repositories;
pub mod reservation;
pub mod resource;
pub mod session;
pub mod subscription;

pub use account::{AccountRepository, AccountStatus};
pub use invoice::{
    BillingPeriod, EnterpriseInvoice, EnterpriseLineItem, Invoice, InvoiceRepository,
    InvoiceStatus, PaymentMethod, PaymentRecord,
};
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{Reservation, ReservationRepository, ReservationStatus};
pub use resource::{
    Charger, ChargingPoint, Facility, ResourceKind, ResourceRef, ResourceRepository,
    ResourceStatus, Station,
};
pub use session::{ChargingSession, SessionOwner, SessionRepository, SessionStatus};
pub use subscription::{
    PlanBenefit, PlanRegistration, RegistrationStatus, ResolvedBenefits, SubscriptionPlan,
    SubscriptionRepository,
};

pub use crate::shared::errors::DomainError;
