//! Driver invoice entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub driver_id: i32,
    #[sea_orm(nullable)]
    pub registration_id: Option<i32>,

    pub period_start: DateTimeUtc,
    pub period_end: DateTimeUtc,
    pub issue_date: DateTimeUtc,
    pub due_date: DateTimeUtc,
    #[sea_orm(nullable)]
    pub paid_date: Option<DateTimeUtc>,

    pub sessions_total: i64,
    pub plan_fee: i64,
    pub total_cost: i64,

    /// unpaid, overdue, paid, cancelled
    pub status: String,

    /// JSON array of session ids
    #[sea_orm(column_type = "Text")]
    pub session_ids: String,

    #[sea_orm(nullable)]
    pub payment_method: Option<String>,
    #[sea_orm(nullable)]
    pub transaction_id: Option<String>,
    #[sea_orm(nullable)]
    pub reference_id: Option<String>,
    #[sea_orm(nullable)]
    pub amount_paid: Option<i64>,

    #[sea_orm(nullable)]
    pub reminder_sent_at: Option<DateTimeUtc>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
