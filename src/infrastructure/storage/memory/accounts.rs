use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{AccountRepository, AccountStatus, DomainResult};

/// Stand-in for the external account service
#[derive(Default)]
pub struct InMemoryAccountRepository {
    statuses: DashMap<i32, AccountStatus>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn status(&self, driver_id: i32) -> DomainResult<AccountStatus> {
        Ok(self
            .statuses
            .get(&driver_id)
            .map(|s| *s)
            .unwrap_or_default())
    }

    async fn set_status(&self, driver_id: i32, status: AccountStatus) -> DomainResult<()> {
        self.statuses.insert(driver_id, status);
        Ok(())
    }
}
