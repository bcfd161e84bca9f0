//! In-memory repositories for tests and single-node runs
//!
//! Each aggregate lives in `DashMap`s. The session table is shared between
//! the session and invoice repositories so that invoice creation and
//! session linking happen under one lock.

mod accounts;
mod invoices;
mod reservations;
mod resources;
mod sessions;
mod subscriptions;

use std::sync::Arc;

pub use accounts::InMemoryAccountRepository;
pub use invoices::InMemoryInvoiceRepository;
pub use reservations::InMemoryReservationRepository;
pub use resources::InMemoryResourceRepository;
pub use sessions::{InMemorySessionRepository, SessionTable};
pub use subscriptions::InMemorySubscriptionRepository;

use crate::domain::{
    AccountRepository, InvoiceRepository, RepositoryProvider, ReservationRepository,
    ResourceRepository, SessionRepository, SubscriptionRepository,
};

pub struct InMemoryRepositoryProvider {
    resources: InMemoryResourceRepository,
    reservations: InMemoryReservationRepository,
    sessions: InMemorySessionRepository,
    subscriptions: InMemorySubscriptionRepository,
    invoices: InMemoryInvoiceRepository,
    accounts: InMemoryAccountRepository,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        let table = Arc::new(SessionTable::new());
        Self {
            resources: InMemoryResourceRepository::new(),
            reservations: InMemoryReservationRepository::new(),
            sessions: InMemorySessionRepository::new(Arc::clone(&table)),
            subscriptions: InMemorySubscriptionRepository::new(),
            invoices: InMemoryInvoiceRepository::new(table),
            accounts: InMemoryAccountRepository::new(),
        }
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn resources(&self) -> &dyn ResourceRepository {
        &self.resources
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }

    fn subscriptions(&self) -> &dyn SubscriptionRepository {
        &self.subscriptions
    }

    fn invoices(&self) -> &dyn InvoiceRepository {
        &self.invoices
    }

    fn accounts(&self) -> &dyn AccountRepository {
        &self.accounts
    }
}
