//! Create driver and enterprise invoice tables
//!
//! `session_ids` and enterprise `lines` are stored as JSON text; the
//! authoritative link is `charging_sessions.invoice_id`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invoices::DriverId).integer().not_null())
                    .col(ColumnDef::new(Invoices::RegistrationId).integer())
                    .col(
                        ColumnDef::new(Invoices::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::IssueDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::DueDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Invoices::PaidDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Invoices::SessionsTotal).big_integer().not_null())
                    .col(ColumnDef::new(Invoices::PlanFee).big_integer().not_null())
                    .col(ColumnDef::new(Invoices::TotalCost).big_integer().not_null())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string()
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(
                        ColumnDef::new(Invoices::SessionIds)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Invoices::PaymentMethod).string())
                    .col(ColumnDef::new(Invoices::TransactionId).string())
                    .col(ColumnDef::new(Invoices::ReferenceId).string())
                    .col(ColumnDef::new(Invoices::AmountPaid).big_integer())
                    .col(ColumnDef::new(Invoices::ReminderSentAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EnterpriseInvoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EnterpriseInvoices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EnterpriseInvoices::EnterpriseId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnterpriseInvoices::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnterpriseInvoices::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnterpriseInvoices::IssueDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnterpriseInvoices::DueDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EnterpriseInvoices::PaidDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(EnterpriseInvoices::TotalCost)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EnterpriseInvoices::Status)
                            .string()
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(
                        ColumnDef::new(EnterpriseInvoices::Lines)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(EnterpriseInvoices::SessionIds)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(EnterpriseInvoices::PaymentMethod).string())
                    .col(ColumnDef::new(EnterpriseInvoices::TransactionId).string())
                    .col(ColumnDef::new(EnterpriseInvoices::ReferenceId).string())
                    .col(ColumnDef::new(EnterpriseInvoices::AmountPaid).big_integer())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_driver")
                    .table(Invoices::Table)
                    .col(Invoices::DriverId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_status_due")
                    .table(Invoices::Table)
                    .col(Invoices::Status)
                    .col(Invoices::DueDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_enterprise_invoices_enterprise")
                    .table(EnterpriseInvoices::Table)
                    .col(EnterpriseInvoices::EnterpriseId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EnterpriseInvoices::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Invoices {
    Table,
    Id,
    DriverId,
    RegistrationId,
    PeriodStart,
    PeriodEnd,
    IssueDate,
    DueDate,
    PaidDate,
    SessionsTotal,
    PlanFee,
    TotalCost,
    Status,
    SessionIds,
    PaymentMethod,
    TransactionId,
    ReferenceId,
    AmountPaid,
    ReminderSentAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum EnterpriseInvoices {
    Table,
    Id,
    EnterpriseId,
    PeriodStart,
    PeriodEnd,
    IssueDate,
    DueDate,
    PaidDate,
    TotalCost,
    Status,
    Lines,
    SessionIds,
    PaymentMethod,
    TransactionId,
    ReferenceId,
    AmountPaid,
}
