//! Account status interface

use async_trait::async_trait;

use super::model::AccountStatus;
use crate::domain::DomainResult;

/// `getAccountStatus` / `setAccountStatus` of the account service.
///
/// Drivers the service has never recorded are `Active`.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn status(&self, driver_id: i32) -> DomainResult<AccountStatus>;

    async fn set_status(&self, driver_id: i32, status: AccountStatus) -> DomainResult<()>;
}
