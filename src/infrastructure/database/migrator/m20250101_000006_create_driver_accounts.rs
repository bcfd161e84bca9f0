//! Create driver_accounts table
//!
//! Only drivers whose standing was ever changed have a row.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DriverAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DriverAccounts::DriverId)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DriverAccounts::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(DriverAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DriverAccounts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum DriverAccounts {
    Table,
    DriverId,
    Status,
    UpdatedAt,
}
