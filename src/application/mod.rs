//! Application layer: services, ports and scheduled jobs

pub mod ports;
pub mod report;
pub mod scheduler;
pub mod services;

use std::sync::Arc;

use crate::domain::RepositoryProvider;
use crate::shared::AdmissionLocks;

pub use ports::{Notifier, PaymentConfirmation, SubscriptionProof, SubscriptionProofVerifier};
pub use report::JobReport;
pub use scheduler::{Job, ScheduleSettings, Scheduler};
pub use services::{
    BenefitResolver, BillingEngine, BillingPolicy, PlanRegistrationService, PricingPolicy,
    RegistrationProofVerifier, ReservationLedger, ResourceRegistry, SessionEngine, StartRequest,
};

/// Every service, wired over one repository provider.
///
/// The reservation ledger, session engine and plan service share one set of
/// admission locks.
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<ResourceRegistry>,
    pub reservations: Arc<ReservationLedger>,
    pub benefits: Arc<BenefitResolver>,
    pub sessions: Arc<SessionEngine>,
    pub plans: Arc<PlanRegistrationService>,
    pub billing: Arc<BillingEngine>,
}

impl Services {
    /// Wire the services with the registration-backed proof verifier.
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn Notifier>,
        pricing: PricingPolicy,
        billing: BillingPolicy,
    ) -> Self {
        let verifier = Arc::new(RegistrationProofVerifier::new(repos.clone()));
        Self::with_verifier(repos, notifier, verifier, pricing, billing)
    }

    pub fn with_verifier(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn Notifier>,
        verifier: Arc<dyn SubscriptionProofVerifier>,
        pricing: PricingPolicy,
        billing: BillingPolicy,
    ) -> Self {
        let locks = Arc::new(AdmissionLocks::new());
        let registry = Arc::new(ResourceRegistry::new(repos.clone()));
        let reservations = Arc::new(ReservationLedger::new(
            repos.clone(),
            registry.clone(),
            locks.clone(),
            notifier.clone(),
        ));
        let benefits = Arc::new(BenefitResolver::new(repos.clone()));
        let sessions = Arc::new(SessionEngine::new(
            repos.clone(),
            registry.clone(),
            reservations.clone(),
            benefits.clone(),
            verifier,
            locks.clone(),
            notifier.clone(),
            pricing,
        ));
        let plans = Arc::new(PlanRegistrationService::new(repos.clone(), locks));
        let billing = Arc::new(BillingEngine::new(repos, benefits.clone(), notifier, billing));

        Self {
            registry,
            reservations,
            benefits,
            sessions,
            plans,
            billing,
        }
    }
}
