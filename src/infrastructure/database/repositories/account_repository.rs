//! SeaORM implementation of AccountRepository

use async_trait::async_trait;
use chrono::Utc;
use log::info;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use super::db_err;
use crate::domain::account::{AccountRepository, AccountStatus};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::driver_account;

pub struct SeaOrmAccountRepository {
    db: DatabaseConnection,
}

impl SeaOrmAccountRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountRepository for SeaOrmAccountRepository {
    async fn status(&self, driver_id: i32) -> DomainResult<AccountStatus> {
        let model = driver_account::Entity::find_by_id(driver_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model
            .map(|m| AccountStatus::from_str(&m.status))
            .unwrap_or_default())
    }

    async fn set_status(&self, driver_id: i32, status: AccountStatus) -> DomainResult<()> {
        let model = driver_account::ActiveModel {
            driver_id: Set(driver_id),
            status: Set(status.as_str().to_string()),
            updated_at: Set(Utc::now()),
        };
        driver_account::Entity::insert(model)
            .on_conflict(
                OnConflict::column(driver_account::Column::DriverId)
                    .update_columns([
                        driver_account::Column::Status,
                        driver_account::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        info!("Driver {} account set to {}", driver_id, status);
        Ok(())
    }
}
