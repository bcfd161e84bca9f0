use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::sessions::SessionTable;
use crate::domain::{
    DomainError, DomainResult, EnterpriseInvoice, Invoice, InvoiceRepository, InvoiceStatus,
};

pub struct InMemoryInvoiceRepository {
    sessions: Arc<SessionTable>,
    invoices: DashMap<i32, Invoice>,
    enterprise_invoices: DashMap<i32, EnterpriseInvoice>,
    next_id: AtomicI32,
    next_enterprise_id: AtomicI32,
}

impl InMemoryInvoiceRepository {
    pub fn new(sessions: Arc<SessionTable>) -> Self {
        Self {
            sessions,
            invoices: DashMap::new(),
            enterprise_invoices: DashMap::new(),
            next_id: AtomicI32::new(1),
            next_enterprise_id: AtomicI32::new(1),
        }
    }

    /// Every id must name an existing session that passes `free`.
    fn check_linkable(
        &self,
        session_ids: &[i32],
        free: impl Fn(&crate::domain::ChargingSession) -> bool,
    ) -> DomainResult<()> {
        for id in session_ids {
            let session = self
                .sessions
                .rows
                .get(id)
                .ok_or_else(|| DomainError::not_found("ChargingSession", id))?;
            if !free(&session) {
                return Err(DomainError::Conflict(format!("session {} is already billed", id)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn create_with_sessions(&self, mut invoice: Invoice) -> DomainResult<Invoice> {
        let _guard = self.sessions.write_lock.lock().await;
        self.check_linkable(&invoice.session_ids, |s| s.invoice_id.is_none())?;

        invoice.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        for id in &invoice.session_ids {
            if let Some(mut session) = self.sessions.rows.get_mut(id) {
                session.invoice_id = Some(invoice.id);
            }
        }
        self.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Invoice>> {
        Ok(self.invoices.get(&id).map(|i| i.clone()))
    }

    async fn update(&self, invoice: Invoice) -> DomainResult<()> {
        match self.invoices.get_mut(&invoice.id) {
            Some(mut row) => {
                *row = invoice;
                Ok(())
            }
            None => Err(DomainError::not_found("Invoice", invoice.id)),
        }
    }

    async fn find_by_status(&self, status: InvoiceStatus) -> DomainResult<Vec<Invoice>> {
        let mut found: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|i| i.status == status)
            .map(|i| i.value().clone())
            .collect();
        found.sort_by_key(|i| i.id);
        Ok(found)
    }

    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Invoice>> {
        let mut found: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|i| i.driver_id == driver_id)
            .map(|i| i.value().clone())
            .collect();
        found.sort_by_key(|i| std::cmp::Reverse(i.id));
        Ok(found)
    }

    async fn cancel_and_release(&self, invoice: Invoice) -> DomainResult<()> {
        let _guard = self.sessions.write_lock.lock().await;
        if !self.invoices.contains_key(&invoice.id) {
            return Err(DomainError::not_found("Invoice", invoice.id));
        }
        for mut session in self.sessions.rows.iter_mut() {
            if session.invoice_id == Some(invoice.id) {
                session.invoice_id = None;
            }
        }
        self.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    async fn create_enterprise_with_sessions(
        &self,
        mut invoice: EnterpriseInvoice,
    ) -> DomainResult<EnterpriseInvoice> {
        let _guard = self.sessions.write_lock.lock().await;
        self.check_linkable(&invoice.session_ids, |s| s.enterprise_invoice_id.is_none())?;

        invoice.id = self.next_enterprise_id.fetch_add(1, Ordering::SeqCst);
        for id in &invoice.session_ids {
            if let Some(mut session) = self.sessions.rows.get_mut(id) {
                session.enterprise_invoice_id = Some(invoice.id);
            }
        }
        self.enterprise_invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn find_enterprise(&self, id: i32) -> DomainResult<Option<EnterpriseInvoice>> {
        Ok(self.enterprise_invoices.get(&id).map(|i| i.clone()))
    }

    async fn update_enterprise(&self, invoice: EnterpriseInvoice) -> DomainResult<()> {
        match self.enterprise_invoices.get_mut(&invoice.id) {
            Some(mut row) => {
                *row = invoice;
                Ok(())
            }
            None => Err(DomainError::not_found("EnterpriseInvoice", invoice.id)),
        }
    }
}
