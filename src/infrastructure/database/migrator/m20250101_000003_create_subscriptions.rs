//! Create subscription plan, benefit and registration tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SubscriptionPlans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionPlans::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SubscriptionPlans::Name).string().not_null())
                    .col(
                        ColumnDef::new(SubscriptionPlans::BaseFee)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionPlans::DurationDays)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionPlans::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlanBenefits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlanBenefits::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlanBenefits::PlanId).integer().not_null())
                    .col(ColumnDef::new(PlanBenefits::Kind).string().not_null())
                    .col(ColumnDef::new(PlanBenefits::Value).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plan_benefits_plan")
                            .from(PlanBenefits::Table, PlanBenefits::PlanId)
                            .to(SubscriptionPlans::Table, SubscriptionPlans::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlanRegistrations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlanRegistrations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlanRegistrations::DriverId).integer().not_null())
                    .col(ColumnDef::new(PlanRegistrations::PlanId).integer().not_null())
                    .col(
                        ColumnDef::new(PlanRegistrations::Status)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(PlanRegistrations::StartDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(PlanRegistrations::EndDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PlanRegistrations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plan_registrations_plan")
                            .from(PlanRegistrations::Table, PlanRegistrations::PlanId)
                            .to(SubscriptionPlans::Table, SubscriptionPlans::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_plan_benefits_plan")
                    .table(PlanBenefits::Table)
                    .col(PlanBenefits::PlanId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_plan_registrations_driver_status")
                    .table(PlanRegistrations::Table)
                    .col(PlanRegistrations::DriverId)
                    .col(PlanRegistrations::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlanRegistrations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PlanBenefits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SubscriptionPlans::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SubscriptionPlans {
    Table,
    Id,
    Name,
    BaseFee,
    DurationDays,
    IsActive,
}

#[derive(Iden)]
pub enum PlanBenefits {
    Table,
    Id,
    PlanId,
    Kind,
    Value,
}

#[derive(Iden)]
pub enum PlanRegistrations {
    Table,
    Id,
    DriverId,
    PlanId,
    Status,
    StartDate,
    EndDate,
    CreatedAt,
}
