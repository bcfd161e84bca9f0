//! Create the resource hierarchy tables
//!
//! facilities > stations > charging_points > chargers. Rows are soft-deleted
//! so historical sessions keep their point.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Facilities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Facilities::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(Facilities::Name).string().not_null())
                    .col(
                        ColumnDef::new(Facilities::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Facilities::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Stations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stations::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(Stations::FacilityId).integer().not_null())
                    .col(ColumnDef::new(Stations::Name).string().not_null())
                    .col(
                        ColumnDef::new(Stations::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Stations::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stations_facility")
                            .from(Stations::Table, Stations::FacilityId)
                            .to(Facilities::Table, Facilities::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChargingPoints::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChargingPoints::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(ChargingPoints::StationId).integer().not_null())
                    .col(ColumnDef::new(ChargingPoints::Name).string().not_null())
                    .col(
                        ColumnDef::new(ChargingPoints::PricePerKwh)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingPoints::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(ChargingPoints::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_charging_points_station")
                            .from(ChargingPoints::Table, ChargingPoints::StationId)
                            .to(Stations::Table, Stations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Chargers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Chargers::Id).integer().not_null().primary_key())
                    .col(ColumnDef::new(Chargers::PointId).integer().not_null())
                    .col(ColumnDef::new(Chargers::ConnectorType).string().not_null())
                    .col(
                        ColumnDef::new(Chargers::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Chargers::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chargers_point")
                            .from(Chargers::Table, Chargers::PointId)
                            .to(ChargingPoints::Table, ChargingPoints::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stations_facility")
                    .table(Stations::Table)
                    .col(Stations::FacilityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_points_station")
                    .table(ChargingPoints::Table)
                    .col(ChargingPoints::StationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chargers_point")
                    .table(Chargers::Table)
                    .col(Chargers::PointId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Chargers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChargingPoints::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Facilities::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Facilities {
    Table,
    Id,
    Name,
    Status,
    Deleted,
}

#[derive(Iden)]
pub enum Stations {
    Table,
    Id,
    FacilityId,
    Name,
    Status,
    Deleted,
}

#[derive(Iden)]
pub enum ChargingPoints {
    Table,
    Id,
    StationId,
    Name,
    PricePerKwh,
    Status,
    Deleted,
}

#[derive(Iden)]
pub enum Chargers {
    Table,
    Id,
    PointId,
    ConnectorType,
    Status,
    Deleted,
}
