//! Charging session entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "charging_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Set for driver sessions
    #[sea_orm(nullable)]
    pub driver_id: Option<i32>,
    /// Set, together with `vehicle_id`, for fleet sessions
    #[sea_orm(nullable)]
    pub enterprise_id: Option<i32>,
    #[sea_orm(nullable)]
    pub vehicle_id: Option<i32>,

    pub point_id: i32,
    #[sea_orm(nullable)]
    pub reservation_id: Option<i32>,

    /// CHARGING, COMPLETED, CANCELLED
    pub status: String,

    pub start_percentage: i32,
    #[sea_orm(nullable)]
    pub end_percentage: Option<i32>,

    /// Decimal kWh as text
    pub kwh_used: String,
    pub cost: i64,
    pub overuse_fee: i64,
    /// Decimal percent as text
    pub discount_percent: String,
    pub fee_waived: bool,

    pub started_at: DateTimeUtc,
    #[sea_orm(nullable)]
    pub ended_at: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub started_by_employee: Option<i32>,
    #[sea_orm(nullable)]
    pub ended_by_employee: Option<i32>,

    #[sea_orm(nullable)]
    pub invoice_id: Option<i32>,
    #[sea_orm(nullable)]
    pub enterprise_invoice_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::charging_point::Entity",
        from = "Column::PointId",
        to = "super::charging_point::Column::Id"
    )]
    ChargingPoint,
}

impl Related<super::charging_point::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChargingPoint.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
