//! Charging point entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "charging_points")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub station_id: i32,
    pub name: String,
    pub price_per_kwh: i64,
    /// active, inactive, using, booked, maintenance
    pub status: String,
    pub deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::station::Entity",
        from = "Column::StationId",
        to = "super::station::Column::Id"
    )]
    Station,
    #[sea_orm(has_many = "super::charger::Entity")]
    Chargers,
}

impl Related<super::station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Station.def()
    }
}

impl Related<super::charger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chargers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
