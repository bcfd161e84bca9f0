//! Invoice repository interface

use async_trait::async_trait;

use super::model::{EnterpriseInvoice, Invoice, InvoiceStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert the invoice and stamp every session in `invoice.session_ids`
    /// with its id, as one atomic step.
    ///
    /// Fails with `Conflict` (and writes nothing) when any of the sessions
    /// already belongs to an invoice.
    async fn create_with_sessions(&self, invoice: Invoice) -> DomainResult<Invoice>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Invoice>>;

    /// Persist status, payment and audit fields of an existing invoice
    async fn update(&self, invoice: Invoice) -> DomainResult<()>;

    async fn find_by_status(&self, status: InvoiceStatus) -> DomainResult<Vec<Invoice>>;

    /// Every invoice of a driver, newest first
    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Invoice>>;

    /// Persist a cancelled invoice and clear its sessions' invoice link, atomically
    async fn cancel_and_release(&self, invoice: Invoice) -> DomainResult<()>;

    /// Enterprise counterpart of [`create_with_sessions`](Self::create_with_sessions)
    async fn create_enterprise_with_sessions(
        &self,
        invoice: EnterpriseInvoice,
    ) -> DomainResult<EnterpriseInvoice>;

    async fn find_enterprise(&self, id: i32) -> DomainResult<Option<EnterpriseInvoice>>;

    async fn update_enterprise(&self, invoice: EnterpriseInvoice) -> DomainResult<()>;
}
