//! Invoicing and the unpaid → overdue → suspended → reactivated cycle
//!
//! Batch procedures handle each driver or invoice on its own: a failure is
//! logged and counted in the returned [`JobReport`], and the rest of the
//! batch carries on.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::application::ports::{Notifier, PaymentConfirmation};
use crate::application::report::JobReport;
use crate::domain::{
    AccountStatus, BillingPeriod, DomainError, DomainResult, EnterpriseInvoice, EnterpriseLineItem,
    Invoice, InvoiceStatus, RepositoryProvider,
};
use crate::notifications::{
    AccountStatusEvent, Event, InvoiceIssuedEvent, InvoiceNoticeEvent, InvoicePaidEvent,
};
use crate::shared::KeyedLocks;

use super::BenefitResolver;

/// Payment terms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingPolicy {
    /// `due_date = issue_date + due_days`
    pub due_days: i64,
    /// Days past the due date before the account is suspended
    pub grace_days: i64,
    /// How long before the due date the reminder goes out
    pub reminder_lead_days: i64,
    /// Flat fee per session, unless the driver's plan waives it
    pub session_fee: i64,
}

impl BillingPolicy {
    pub fn due_in(&self) -> Duration {
        Duration::days(self.due_days)
    }

    pub fn grace(&self) -> Duration {
        Duration::days(self.grace_days)
    }
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            due_days: 7,
            grace_days: 7,
            reminder_lead_days: 2,
            session_fee: 0,
        }
    }
}

pub struct BillingEngine {
    repos: Arc<dyn RepositoryProvider>,
    benefits: Arc<BenefitResolver>,
    notifier: Arc<dyn Notifier>,
    policy: BillingPolicy,
    invoice_locks: KeyedLocks,
    enterprise_locks: KeyedLocks,
    /// Serializes suspension against reactivation of one driver's account
    account_locks: KeyedLocks,
}

impl BillingEngine {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        benefits: Arc<BenefitResolver>,
        notifier: Arc<dyn Notifier>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            repos,
            benefits,
            notifier,
            policy,
            invoice_locks: KeyedLocks::new(),
            enterprise_locks: KeyedLocks::new(),
            account_locks: KeyedLocks::new(),
        }
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    // ── Issuing ────────────────────────────────────────────────

    /// Invoice every driver who held a plan at some point of `period`, even
    /// if it has lapsed by the time the batch runs.
    pub async fn generate_invoices(&self, period: BillingPeriod, now: DateTime<Utc>) -> DomainResult<JobReport> {
        let started = Instant::now();
        let mut report = JobReport::new("monthly_billing");

        let mut drivers: Vec<i32> = self
            .repos
            .subscriptions()
            .find_registrations_overlapping(period.start, period.end)
            .await?
            .into_iter()
            .map(|r| r.driver_id)
            .collect();
        drivers.sort_unstable();
        drivers.dedup();

        for driver_id in drivers {
            match self.generate_invoice_for_driver(driver_id, period, now).await {
                Ok(Some(_)) => report.success(),
                Ok(None) => report.skip(),
                Err(e) => report.failure(format!("driver {}", driver_id), &e),
            }
        }
        Ok(report.finish(started))
    }

    /// Bill one driver's unbilled completed sessions in `period`.
    ///
    /// Returns `None` when there is nothing to bill. The plan base fee of the
    /// registration in force at `now` is added. Creation and session linking
    /// are one atomic step; a session billed concurrently makes this fail
    /// with `Conflict` and leaves nothing behind.
    pub async fn generate_invoice_for_driver(
        &self,
        driver_id: i32,
        period: BillingPeriod,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Invoice>> {
        let sessions = self
            .repos
            .sessions()
            .find_unbilled_for_driver(driver_id, period.start, period.end)
            .await?;
        if sessions.is_empty() {
            debug!(driver_id, "No unbilled sessions in period");
            return Ok(None);
        }

        let sessions_total: i64 = sessions
            .iter()
            .map(|s| s.billable_amount(self.policy.session_fee))
            .sum();
        let registration = self.benefits.active_registration(driver_id, now).await?;
        let plan_fee = registration.as_ref().map(|(_, plan)| plan.base_fee).unwrap_or(0);

        let mut invoice = Invoice::issue(
            driver_id,
            period,
            sessions_total,
            plan_fee,
            sessions.iter().map(|s| s.id).collect(),
            now,
            self.policy.due_in(),
        );
        invoice.registration_id = registration.map(|(r, _)| r.id);

        let invoice = self.repos.invoices().create_with_sessions(invoice).await?;
        info!(
            invoice_id = invoice.id,
            driver_id,
            sessions = invoice.session_ids.len(),
            total_cost = invoice.total_cost,
            due_date = %invoice.due_date,
            "Invoice issued"
        );
        self.notifier.notify(Event::InvoiceIssued(InvoiceIssuedEvent {
            invoice_id: invoice.id,
            driver_id: Some(driver_id),
            enterprise_id: None,
            total_cost: invoice.total_cost,
            due_date: invoice.due_date,
            timestamp: now,
        }));
        Ok(Some(invoice))
    }

    // ── Ageing ─────────────────────────────────────────────────

    /// `unpaid` invoices past their due date become `overdue`.
    pub async fn mark_overdue(&self, now: DateTime<Utc>) -> DomainResult<JobReport> {
        let started = Instant::now();
        let mut report = JobReport::new("overdue_sweep");

        let candidates = self.repos.invoices().find_by_status(InvoiceStatus::Unpaid).await?;
        for invoice in candidates.into_iter().filter(|i| i.is_past_due(now)) {
            match self.mark_one_overdue(invoice.id, now).await {
                Ok(true) => report.success(),
                Ok(false) => report.skip(),
                Err(e) => report.failure(format!("invoice {}", invoice.id), &e),
            }
        }
        Ok(report.finish(started))
    }

    async fn mark_one_overdue(&self, invoice_id: i32, now: DateTime<Utc>) -> DomainResult<bool> {
        let _guard = self.invoice_locks.lock(invoice_id).await;
        let mut invoice = self.invoice(invoice_id).await?;
        if !invoice.is_past_due(now) {
            return Ok(false);
        }
        invoice.mark_overdue(now)?;
        self.repos.invoices().update(invoice.clone()).await?;

        info!(invoice_id, driver_id = invoice.driver_id, due_date = %invoice.due_date, "Invoice overdue");
        self.notifier.notify(Event::InvoiceOverdue(notice(&invoice, now)));
        Ok(true)
    }

    /// Suspend drivers holding an invoice still unpaid past the grace period.
    ///
    /// Drivers already suspended are skipped, so repeated runs change nothing.
    pub async fn suspend_overdue_accounts(&self, now: DateTime<Utc>) -> DomainResult<JobReport> {
        let started = Instant::now();
        let mut report = JobReport::new("suspension_sweep");
        let grace = self.policy.grace();

        let invoices = self.repos.invoices();
        let mut candidates = invoices.find_by_status(InvoiceStatus::Overdue).await?;
        candidates.extend(invoices.find_by_status(InvoiceStatus::Unpaid).await?);
        candidates.retain(|i| i.is_past_grace(now, grace));
        candidates.sort_by_key(|i| i.id);

        let mut seen = HashSet::new();
        for invoice in candidates {
            if !seen.insert(invoice.driver_id) {
                continue;
            }
            match self.suspend_driver(invoice.driver_id, now).await {
                Ok(true) => report.success(),
                Ok(false) => report.skip(),
                Err(e) => report.failure(format!("driver {}", invoice.driver_id), &e),
            }
        }
        Ok(report.finish(started))
    }

    /// The candidate list is a snapshot; a payment may have landed since, so
    /// the driver's invoices are read again under the account lock.
    async fn suspend_driver(&self, driver_id: i32, now: DateTime<Utc>) -> DomainResult<bool> {
        let _guard = self.account_locks.lock(driver_id).await;
        let accounts = self.repos.accounts();
        if accounts.status(driver_id).await? == AccountStatus::Suspended {
            return Ok(false);
        }

        let grace = self.policy.grace();
        let Some(invoice_id) = self
            .repos
            .invoices()
            .find_for_driver(driver_id)
            .await?
            .into_iter()
            .filter(|i| i.is_past_grace(now, grace))
            .map(|i| i.id)
            .min()
        else {
            debug!(driver_id, "Nothing left past grace, not suspending");
            return Ok(false);
        };
        accounts.set_status(driver_id, AccountStatus::Suspended).await?;

        info!(driver_id, invoice_id, "Account suspended for non-payment");
        metrics::counter!("account_status_changes_total", "to" => "suspended").increment(1);
        self.notifier.notify(Event::AccountSuspended(AccountStatusEvent {
            driver_id,
            invoice_id,
            timestamp: now,
        }));
        Ok(true)
    }

    /// One reminder per unpaid invoice, sent within the lead window before
    /// its due date.
    pub async fn send_due_reminders(&self, now: DateTime<Utc>) -> DomainResult<JobReport> {
        let started = Instant::now();
        let mut report = JobReport::new("reminder_sweep");
        let lead = Duration::days(self.policy.reminder_lead_days);

        let unpaid = self.repos.invoices().find_by_status(InvoiceStatus::Unpaid).await?;
        for invoice in unpaid {
            if invoice.reminder_sent_at.is_some() || invoice.due_date <= now || invoice.due_date - lead > now {
                continue;
            }
            match self.remind_one(invoice.id, now).await {
                Ok(true) => report.success(),
                Ok(false) => report.skip(),
                Err(e) => report.failure(format!("invoice {}", invoice.id), &e),
            }
        }
        Ok(report.finish(started))
    }

    async fn remind_one(&self, invoice_id: i32, now: DateTime<Utc>) -> DomainResult<bool> {
        let _guard = self.invoice_locks.lock(invoice_id).await;
        let mut invoice = self.invoice(invoice_id).await?;
        if invoice.status != InvoiceStatus::Unpaid || invoice.reminder_sent_at.is_some() {
            return Ok(false);
        }
        invoice.reminder_sent_at = Some(now);
        invoice.updated_at = now;
        self.repos.invoices().update(invoice.clone()).await?;

        debug!(invoice_id, driver_id = invoice.driver_id, "Due reminder sent");
        self.notifier.notify(Event::InvoiceDueSoon(notice(&invoice, now)));
        Ok(true)
    }

    // ── Settlement ─────────────────────────────────────────────

    /// Apply a verified payment-gateway callback to an invoice.
    ///
    /// Paying a `paid` invoice fails and changes nothing. A successful
    /// payment reactivates a suspended account even if the driver has other
    /// outstanding invoices.
    pub async fn pay_invoice(
        &self,
        invoice_id: i32,
        confirmation: PaymentConfirmation,
        now: DateTime<Utc>,
    ) -> DomainResult<Invoice> {
        let _guard = self.invoice_locks.lock(invoice_id).await;
        let mut invoice = self.invoice(invoice_id).await?;

        if !invoice.is_outstanding() {
            return Err(DomainError::InvalidTransition(format!(
                "invoice {} is {}",
                invoice_id, invoice.status
            )));
        }
        check_confirmation(&confirmation, invoice.total_cost)?;

        let method = confirmation.method;
        invoice.mark_paid(confirmation.into_record(), now)?;
        self.repos.invoices().update(invoice.clone()).await?;
        info!(
            invoice_id,
            driver_id = invoice.driver_id,
            method = method.as_str(),
            amount = invoice.total_cost,
            "Invoice paid"
        );

        let _account_guard = self.account_locks.lock(invoice.driver_id).await;
        let accounts = self.repos.accounts();
        if accounts.status(invoice.driver_id).await? == AccountStatus::Suspended {
            accounts.set_status(invoice.driver_id, AccountStatus::Active).await?;
            info!(driver_id = invoice.driver_id, invoice_id, "Account reactivated");
            metrics::counter!("account_status_changes_total", "to" => "active").increment(1);
            self.notifier.notify(Event::AccountReactivated(AccountStatusEvent {
                driver_id: invoice.driver_id,
                invoice_id,
                timestamp: now,
            }));
        }

        self.notifier.notify(Event::InvoicePaid(InvoicePaidEvent {
            invoice_id,
            driver_id: Some(invoice.driver_id),
            enterprise_id: None,
            amount_paid: invoice.payment.as_ref().map(|p| p.amount_paid).unwrap_or(0),
            method: method.as_str().to_string(),
            timestamp: now,
        }));
        Ok(invoice)
    }

    /// Void an outstanding invoice and release its sessions for rebilling.
    pub async fn cancel_invoice(&self, invoice_id: i32, now: DateTime<Utc>) -> DomainResult<Invoice> {
        let _guard = self.invoice_locks.lock(invoice_id).await;
        let mut invoice = self.invoice(invoice_id).await?;
        invoice.cancel(now)?;
        self.repos.invoices().cancel_and_release(invoice.clone()).await?;
        info!(invoice_id, driver_id = invoice.driver_id, "Invoice cancelled");
        Ok(invoice)
    }

    pub async fn find_invoice(&self, invoice_id: i32) -> DomainResult<Option<Invoice>> {
        self.repos.invoices().find_by_id(invoice_id).await
    }

    /// Invoice history of a driver, newest first.
    pub async fn invoices_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Invoice>> {
        self.repos.invoices().find_for_driver(driver_id).await
    }

    // ── Enterprise ─────────────────────────────────────────────

    /// Consolidated invoice for one enterprise: one line per vehicle.
    pub async fn generate_enterprise_invoice(
        &self,
        enterprise_id: i32,
        period: BillingPeriod,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<EnterpriseInvoice>> {
        let sessions = self
            .repos
            .sessions()
            .find_unbilled_for_enterprise(enterprise_id, period.start, period.end)
            .await?;
        if sessions.is_empty() {
            return Ok(None);
        }

        let mut by_vehicle: BTreeMap<i32, EnterpriseLineItem> = BTreeMap::new();
        for session in &sessions {
            let Some(vehicle_id) = session.owner.vehicle_id() else {
                continue;
            };
            let line = by_vehicle.entry(vehicle_id).or_insert_with(|| EnterpriseLineItem {
                vehicle_id,
                session_count: 0,
                kwh_used: Decimal::ZERO,
                amount: 0,
            });
            line.session_count += 1;
            line.kwh_used += session.kwh_used;
            line.amount += session.cost + session.overuse_fee;
        }

        let invoice = EnterpriseInvoice::issue(
            enterprise_id,
            period,
            by_vehicle.into_values().collect(),
            sessions.iter().map(|s| s.id).collect(),
            now,
            self.policy.due_in(),
        );
        let invoice = self.repos.invoices().create_enterprise_with_sessions(invoice).await?;

        info!(
            enterprise_invoice_id = invoice.id,
            enterprise_id,
            vehicles = invoice.lines.len(),
            total_cost = invoice.total_cost,
            "Enterprise invoice issued"
        );
        self.notifier.notify(Event::InvoiceIssued(InvoiceIssuedEvent {
            invoice_id: invoice.id,
            driver_id: None,
            enterprise_id: Some(enterprise_id),
            total_cost: invoice.total_cost,
            due_date: invoice.due_date,
            timestamp: now,
        }));
        Ok(Some(invoice))
    }

    /// Invoice every enterprise with unbilled sessions in `period`.
    pub async fn generate_enterprise_invoices(
        &self,
        period: BillingPeriod,
        now: DateTime<Utc>,
    ) -> DomainResult<JobReport> {
        let started = Instant::now();
        let mut report = JobReport::new("enterprise_billing");

        let enterprises = self
            .repos
            .sessions()
            .enterprises_with_unbilled(period.start, period.end)
            .await?;
        for enterprise_id in enterprises {
            match self.generate_enterprise_invoice(enterprise_id, period, now).await {
                Ok(Some(_)) => report.success(),
                Ok(None) => report.skip(),
                Err(e) => report.failure(format!("enterprise {}", enterprise_id), &e),
            }
        }
        Ok(report.finish(started))
    }

    pub async fn pay_enterprise_invoice(
        &self,
        invoice_id: i32,
        confirmation: PaymentConfirmation,
        now: DateTime<Utc>,
    ) -> DomainResult<EnterpriseInvoice> {
        let _guard = self.enterprise_locks.lock(invoice_id).await;
        let mut invoice = self
            .repos
            .invoices()
            .find_enterprise(invoice_id)
            .await?
            .ok_or_else(|| DomainError::not_found("EnterpriseInvoice", invoice_id))?;

        if !invoice.status.is_outstanding() {
            return Err(DomainError::InvalidTransition(format!(
                "enterprise invoice {} is {}",
                invoice_id, invoice.status
            )));
        }
        check_confirmation(&confirmation, invoice.total_cost)?;

        let method = confirmation.method;
        let amount_paid = confirmation.amount_paid;
        invoice.mark_paid(confirmation.into_record(), now)?;
        self.repos.invoices().update_enterprise(invoice.clone()).await?;

        info!(invoice_id, enterprise_id = invoice.enterprise_id, "Enterprise invoice paid");
        self.notifier.notify(Event::InvoicePaid(InvoicePaidEvent {
            invoice_id,
            driver_id: None,
            enterprise_id: Some(invoice.enterprise_id),
            amount_paid,
            method: method.as_str().to_string(),
            timestamp: now,
        }));
        Ok(invoice)
    }

    pub async fn find_enterprise_invoice(&self, invoice_id: i32) -> DomainResult<Option<EnterpriseInvoice>> {
        self.repos.invoices().find_enterprise(invoice_id).await
    }

    async fn invoice(&self, invoice_id: i32) -> DomainResult<Invoice> {
        self.repos
            .invoices()
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Invoice", invoice_id))
    }
}

fn check_confirmation(confirmation: &PaymentConfirmation, total_cost: i64) -> DomainResult<()> {
    if !confirmation.success {
        return Err(DomainError::InvalidInput("payment was not successful".into()));
    }
    if confirmation.amount_paid < total_cost {
        return Err(DomainError::InvalidInput(format!(
            "paid {} of {}",
            confirmation.amount_paid, total_cost
        )));
    }
    Ok(())
}

fn notice(invoice: &Invoice, now: DateTime<Utc>) -> InvoiceNoticeEvent {
    InvoiceNoticeEvent {
        invoice_id: invoice.id,
        driver_id: invoice.driver_id,
        total_cost: invoice.total_cost,
        due_date: invoice.due_date,
        timestamp: now,
    }
}
