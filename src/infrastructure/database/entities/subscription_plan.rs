//! Subscription plan entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscription_plans")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub name: String,
    pub base_fee: i64,
    pub duration_days: i64,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::plan_benefit::Entity")]
    Benefits,
}

impl Related<super::plan_benefit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Benefits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
