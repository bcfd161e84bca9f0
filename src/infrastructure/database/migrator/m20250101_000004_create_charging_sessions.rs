//! Create charging_sessions table
//!
//! Partial unique indexes keep at most one CHARGING session per point,
//! per driver and per fleet vehicle, whatever the application does.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::ConnectionTrait;

use super::m20250101_000001_create_resources::ChargingPoints;

#[derive(DeriveMigrationName)]
pub struct Migration;

const CHARGING_UNIQUE_INDEXES: [&str; 3] = [
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_sessions_charging_point \
     ON charging_sessions (point_id) WHERE status = 'CHARGING'",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_sessions_charging_driver \
     ON charging_sessions (driver_id) WHERE status = 'CHARGING' AND driver_id IS NOT NULL",
    "CREATE UNIQUE INDEX IF NOT EXISTS ux_sessions_charging_vehicle \
     ON charging_sessions (vehicle_id) WHERE status = 'CHARGING' AND vehicle_id IS NOT NULL",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargingSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargingSessions::DriverId).integer())
                    .col(ColumnDef::new(ChargingSessions::EnterpriseId).integer())
                    .col(ColumnDef::new(ChargingSessions::VehicleId).integer())
                    .col(ColumnDef::new(ChargingSessions::PointId).integer().not_null())
                    .col(ColumnDef::new(ChargingSessions::ReservationId).integer())
                    .col(
                        ColumnDef::new(ChargingSessions::Status)
                            .string()
                            .not_null()
                            .default("CHARGING"),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::StartPercentage)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::EndPercentage).integer())
                    .col(
                        ColumnDef::new(ChargingSessions::KwhUsed)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::Cost)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::OveruseFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::DiscountPercent)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::FeeWaived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::EndedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(ChargingSessions::StartedByEmployee).integer())
                    .col(ColumnDef::new(ChargingSessions::EndedByEmployee).integer())
                    .col(ColumnDef::new(ChargingSessions::InvoiceId).integer())
                    .col(ColumnDef::new(ChargingSessions::EnterpriseInvoiceId).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_sessions_point")
                            .from(ChargingSessions::Table, ChargingSessions::PointId)
                            .to(ChargingPoints::Table, ChargingPoints::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_driver_ended")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::DriverId)
                    .col(ChargingSessions::EndedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_enterprise_ended")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::EnterpriseId)
                    .col(ChargingSessions::EndedAt)
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();
        for sql in CHARGING_UNIQUE_INDEXES {
            db.execute_unprepared(sql).await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingSessions {
    Table,
    Id,
    DriverId,
    EnterpriseId,
    VehicleId,
    PointId,
    ReservationId,
    Status,
    StartPercentage,
    EndPercentage,
    KwhUsed,
    Cost,
    OveruseFee,
    DiscountPercent,
    FeeWaived,
    StartedAt,
    EndedAt,
    StartedByEmployee,
    EndedByEmployee,
    InvoiceId,
    EnterpriseInvoiceId,
}
