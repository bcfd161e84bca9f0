//! Charger entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chargers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub point_id: i32,
    pub connector_type: String,
    pub status: String,
    pub deleted: bool,
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
