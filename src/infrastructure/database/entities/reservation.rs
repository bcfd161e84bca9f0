//! Reservation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub driver_id: i32,
    pub point_id: i32,
    #[sea_orm(nullable)]
    pub vehicle_id: Option<i32>,
    pub start_time: DateTimeUtc,
    pub end_time: DateTimeUtc,
    /// ACTIVE, CANCELLED, COMPLETED, EXPIRED
    pub status: String,
    pub created_at: DateTimeUtc,
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
