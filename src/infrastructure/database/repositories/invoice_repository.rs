//! SeaORM implementation of InvoiceRepository
//!
//! Invoice creation and session linking share one database transaction. The
//! link is a guarded `UPDATE ... WHERE invoice_id IS NULL`; if it touches
//! fewer rows than expected some session was billed concurrently and the
//! whole transaction is rolled back.

use std::collections::HashSet;

use async_trait::async_trait;
use log::{debug, info};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseTransaction, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use super::{db_err, json_err, parse_decimal};
use crate::domain::invoice::{
    BillingPeriod, EnterpriseInvoice, EnterpriseLineItem, Invoice, InvoiceRepository,
    InvoiceStatus, PaymentMethod, PaymentRecord,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{charging_session, enterprise_invoice, invoice};

pub struct SeaOrmInvoiceRepository {
    db: DatabaseConnection,
}

impl SeaOrmInvoiceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Which invoice column on `charging_sessions` a link targets
#[derive(Clone, Copy)]
enum LinkColumn {
    Driver,
    Enterprise,
}

impl LinkColumn {
    fn column(self) -> charging_session::Column {
        match self {
            Self::Driver => charging_session::Column::InvoiceId,
            Self::Enterprise => charging_session::Column::EnterpriseInvoiceId,
        }
    }
}

/// Stamp `invoice_id` onto every session in `session_ids` that is still free.
async fn link_sessions(
    txn: &DatabaseTransaction,
    link: LinkColumn,
    invoice_id: i32,
    session_ids: &[i32],
) -> DomainResult<()> {
    if session_ids.is_empty() {
        return Ok(());
    }

    let existing: HashSet<i32> = charging_session::Entity::find()
        .select_only()
        .column(charging_session::Column::Id)
        .filter(charging_session::Column::Id.is_in(session_ids.iter().copied()))
        .into_tuple::<i32>()
        .all(txn)
        .await
        .map_err(db_err)?
        .into_iter()
        .collect();
    if let Some(missing) = session_ids.iter().find(|id| !existing.contains(id)) {
        return Err(DomainError::not_found("ChargingSession", missing));
    }

    let result = charging_session::Entity::update_many()
        .col_expr(link.column(), Expr::value(invoice_id))
        .filter(charging_session::Column::Id.is_in(session_ids.iter().copied()))
        .filter(link.column().is_null())
        .exec(txn)
        .await
        .map_err(db_err)?;

    if result.rows_affected != session_ids.len() as u64 {
        return Err(DomainError::Conflict(format!(
            "{} of {} sessions already billed",
            session_ids.len() as u64 - result.rows_affected,
            session_ids.len()
        )));
    }
    Ok(())
}

// ── Conversion helpers ──────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct LineRow {
    vehicle_id: i32,
    session_count: i32,
    kwh_used: String,
    amount: i64,
}

fn encode_ids(ids: &[i32]) -> DomainResult<String> {
    serde_json::to_string(ids).map_err(json_err)
}

fn decode_ids(raw: &str) -> DomainResult<Vec<i32>> {
    serde_json::from_str(raw).map_err(json_err)
}

fn encode_lines(lines: &[EnterpriseLineItem]) -> DomainResult<String> {
    let rows: Vec<LineRow> = lines
        .iter()
        .map(|l| LineRow {
            vehicle_id: l.vehicle_id,
            session_count: l.session_count,
            kwh_used: l.kwh_used.to_string(),
            amount: l.amount,
        })
        .collect();
    serde_json::to_string(&rows).map_err(json_err)
}

fn decode_lines(raw: &str) -> DomainResult<Vec<EnterpriseLineItem>> {
    let rows: Vec<LineRow> = serde_json::from_str(raw).map_err(json_err)?;
    Ok(rows
        .into_iter()
        .map(|r| EnterpriseLineItem {
            vehicle_id: r.vehicle_id,
            session_count: r.session_count,
            kwh_used: parse_decimal("enterprise_invoices.lines", &r.kwh_used),
            amount: r.amount,
        })
        .collect())
}

fn payment_from(
    method: Option<String>,
    transaction_id: Option<String>,
    reference_id: Option<String>,
    amount_paid: Option<i64>,
) -> Option<PaymentRecord> {
    let method = method.as_deref().and_then(PaymentMethod::from_str)?;
    Some(PaymentRecord {
        method,
        transaction_id,
        reference_id,
        amount_paid: amount_paid.unwrap_or_default(),
    })
}

fn invoice_to_domain(m: invoice::Model) -> DomainResult<Invoice> {
    Ok(Invoice {
        id: m.id,
        driver_id: m.driver_id,
        registration_id: m.registration_id,
        period: BillingPeriod {
            start: m.period_start,
            end: m.period_end,
        },
        issue_date: m.issue_date,
        due_date: m.due_date,
        paid_date: m.paid_date,
        sessions_total: m.sessions_total,
        plan_fee: m.plan_fee,
        total_cost: m.total_cost,
        status: InvoiceStatus::from_str(&m.status),
        session_ids: decode_ids(&m.session_ids)?,
        payment: payment_from(m.payment_method, m.transaction_id, m.reference_id, m.amount_paid),
        reminder_sent_at: m.reminder_sent_at,
        updated_at: m.updated_at,
    })
}

fn invoice_to_active(i: &Invoice) -> DomainResult<invoice::ActiveModel> {
    let payment = i.payment.as_ref();
    Ok(invoice::ActiveModel {
        id: if i.id == 0 { NotSet } else { Set(i.id) },
        driver_id: Set(i.driver_id),
        registration_id: Set(i.registration_id),
        period_start: Set(i.period.start),
        period_end: Set(i.period.end),
        issue_date: Set(i.issue_date),
        due_date: Set(i.due_date),
        paid_date: Set(i.paid_date),
        sessions_total: Set(i.sessions_total),
        plan_fee: Set(i.plan_fee),
        total_cost: Set(i.total_cost),
        status: Set(i.status.as_str().to_string()),
        session_ids: Set(encode_ids(&i.session_ids)?),
        payment_method: Set(payment.map(|p| p.method.as_str().to_string())),
        transaction_id: Set(payment.and_then(|p| p.transaction_id.clone())),
        reference_id: Set(payment.and_then(|p| p.reference_id.clone())),
        amount_paid: Set(payment.map(|p| p.amount_paid)),
        reminder_sent_at: Set(i.reminder_sent_at),
        updated_at: Set(i.updated_at),
    })
}

fn enterprise_to_domain(m: enterprise_invoice::Model) -> DomainResult<EnterpriseInvoice> {
    Ok(EnterpriseInvoice {
        id: m.id,
        enterprise_id: m.enterprise_id,
        period: BillingPeriod {
            start: m.period_start,
            end: m.period_end,
        },
        issue_date: m.issue_date,
        due_date: m.due_date,
        paid_date: m.paid_date,
        total_cost: m.total_cost,
        status: InvoiceStatus::from_str(&m.status),
        lines: decode_lines(&m.lines)?,
        session_ids: decode_ids(&m.session_ids)?,
        payment: payment_from(m.payment_method, m.transaction_id, m.reference_id, m.amount_paid),
    })
}

fn enterprise_to_active(i: &EnterpriseInvoice) -> DomainResult<enterprise_invoice::ActiveModel> {
    let payment = i.payment.as_ref();
    Ok(enterprise_invoice::ActiveModel {
        id: if i.id == 0 { NotSet } else { Set(i.id) },
        enterprise_id: Set(i.enterprise_id),
        period_start: Set(i.period.start),
        period_end: Set(i.period.end),
        issue_date: Set(i.issue_date),
        due_date: Set(i.due_date),
        paid_date: Set(i.paid_date),
        total_cost: Set(i.total_cost),
        status: Set(i.status.as_str().to_string()),
        lines: Set(encode_lines(&i.lines)?),
        session_ids: Set(encode_ids(&i.session_ids)?),
        payment_method: Set(payment.map(|p| p.method.as_str().to_string())),
        transaction_id: Set(payment.and_then(|p| p.transaction_id.clone())),
        reference_id: Set(payment.and_then(|p| p.reference_id.clone())),
        amount_paid: Set(payment.map(|p| p.amount_paid)),
    })
}

// ── InvoiceRepository impl ──────────────────────────────────────

#[async_trait]
impl InvoiceRepository for SeaOrmInvoiceRepository {
    async fn create_with_sessions(&self, mut inv: Invoice) -> DomainResult<Invoice> {
        inv.id = 0;
        let txn = self.db.begin().await.map_err(db_err)?;

        let model = invoice_to_active(&inv)?.insert(&txn).await.map_err(db_err)?;
        link_sessions(&txn, LinkColumn::Driver, model.id, &inv.session_ids).await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            "Invoice {} created for driver {} ({} sessions, total {})",
            model.id,
            model.driver_id,
            inv.session_ids.len(),
            model.total_cost
        );
        invoice_to_domain(model)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Invoice>> {
        invoice::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(invoice_to_domain)
            .transpose()
    }

    async fn update(&self, inv: Invoice) -> DomainResult<()> {
        debug!("Updating invoice {} ({})", inv.id, inv.status);
        let existing = invoice::Entity::find_by_id(inv.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("Invoice", inv.id));
        }
        invoice_to_active(&inv)?
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_status(&self, status: InvoiceStatus) -> DomainResult<Vec<Invoice>> {
        invoice::Entity::find()
            .filter(invoice::Column::Status.eq(status.as_str()))
            .order_by_asc(invoice::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(invoice_to_domain)
            .collect()
    }

    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Invoice>> {
        invoice::Entity::find()
            .filter(invoice::Column::DriverId.eq(driver_id))
            .order_by_desc(invoice::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(invoice_to_domain)
            .collect()
    }

    async fn cancel_and_release(&self, inv: Invoice) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let existing = invoice::Entity::find_by_id(inv.id)
            .one(&txn)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("Invoice", inv.id));
        }
        invoice_to_active(&inv)?.update(&txn).await.map_err(db_err)?;

        let released = charging_session::Entity::update_many()
            .col_expr(charging_session::Column::InvoiceId, Expr::value(Option::<i32>::None))
            .filter(charging_session::Column::InvoiceId.eq(inv.id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(
            "Invoice {} cancelled, {} sessions released",
            inv.id, released.rows_affected
        );
        Ok(())
    }

    async fn create_enterprise_with_sessions(
        &self,
        mut inv: EnterpriseInvoice,
    ) -> DomainResult<EnterpriseInvoice> {
        inv.id = 0;
        let txn = self.db.begin().await.map_err(db_err)?;

        let model = enterprise_to_active(&inv)?
            .insert(&txn)
            .await
            .map_err(db_err)?;
        link_sessions(&txn, LinkColumn::Enterprise, model.id, &inv.session_ids).await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            "Enterprise invoice {} created for enterprise {} (total {})",
            model.id, model.enterprise_id, model.total_cost
        );
        enterprise_to_domain(model)
    }

    async fn find_enterprise(&self, id: i32) -> DomainResult<Option<EnterpriseInvoice>> {
        enterprise_invoice::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(enterprise_to_domain)
            .transpose()
    }

    async fn update_enterprise(&self, inv: EnterpriseInvoice) -> DomainResult<()> {
        debug!("Updating enterprise invoice {} ({})", inv.id, inv.status);
        let existing = enterprise_invoice::Entity::find_by_id(inv.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("EnterpriseInvoice", inv.id));
        }
        enterprise_to_active(&inv)?
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
