use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::domain::{ChargingSession, DomainError, DomainResult, SessionRepository, SessionStatus};

/// Session rows shared with the invoice repository.
///
/// `write_lock` plays the part of the SQL unique indexes and of the
/// invoice-linking transaction: every insert, update and link takes it.
pub struct SessionTable {
    pub(super) rows: DashMap<i32, ChargingSession>,
    next_id: AtomicI32,
    pub(super) write_lock: Mutex<()>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI32::new(1),
            write_lock: Mutex::new(()),
        }
    }

    fn collect(&self, filter: impl Fn(&ChargingSession) -> bool) -> Vec<ChargingSession> {
        let mut found: Vec<ChargingSession> = self
            .rows
            .iter()
            .filter(|s| filter(s.value()))
            .map(|s| s.value().clone())
            .collect();
        found.sort_by_key(|s| s.id);
        found
    }

    fn charging_where(&self, filter: impl Fn(&ChargingSession) -> bool) -> Option<ChargingSession> {
        self.collect(|s| s.is_charging() && filter(s)).into_iter().next()
    }

    fn unbilled_in(s: &ChargingSession, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        s.status == SessionStatus::Completed
            && s.ended_at.is_some_and(|at| start <= at && at < end)
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemorySessionRepository {
    table: Arc<SessionTable>,
}

impl InMemorySessionRepository {
    pub fn new(table: Arc<SessionTable>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn insert(&self, mut session: ChargingSession) -> DomainResult<ChargingSession> {
        let _guard = self.table.write_lock.lock().await;

        if session.is_charging() {
            let owner = session.owner;
            let clash = self.table.charging_where(|s| {
                s.point_id == session.point_id
                    || (owner.driver_id().is_some() && s.owner.driver_id() == owner.driver_id())
                    || (owner.vehicle_id().is_some() && s.owner.vehicle_id() == owner.vehicle_id())
            });
            if let Some(existing) = clash {
                return Err(DomainError::Conflict(format!(
                    "session {} already charging for point {} / {}",
                    existing.id, existing.point_id, existing.owner
                )));
            }
        }

        session.id = self.table.next_id.fetch_add(1, Ordering::SeqCst);
        self.table.rows.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ChargingSession>> {
        Ok(self.table.rows.get(&id).map(|s| s.clone()))
    }

    async fn update(&self, session: ChargingSession) -> DomainResult<()> {
        let _guard = self.table.write_lock.lock().await;
        match self.table.rows.get_mut(&session.id) {
            Some(mut row) => {
                *row = session;
                Ok(())
            }
            None => Err(DomainError::not_found("ChargingSession", session.id)),
        }
    }

    async fn find_charging_for_point(&self, point_id: i32) -> DomainResult<Option<ChargingSession>> {
        Ok(self.table.charging_where(|s| s.point_id == point_id))
    }

    async fn find_charging_for_driver(&self, driver_id: i32) -> DomainResult<Option<ChargingSession>> {
        Ok(self.table.charging_where(|s| s.owner.driver_id() == Some(driver_id)))
    }

    async fn find_charging_for_vehicle(&self, vehicle_id: i32) -> DomainResult<Option<ChargingSession>> {
        Ok(self.table.charging_where(|s| s.owner.vehicle_id() == Some(vehicle_id)))
    }

    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<ChargingSession>> {
        let mut found = self.table.collect(|s| s.owner.driver_id() == Some(driver_id));
        found.reverse();
        Ok(found)
    }

    async fn find_unbilled_for_driver(
        &self,
        driver_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        Ok(self.table.collect(|s| {
            s.owner.driver_id() == Some(driver_id)
                && s.invoice_id.is_none()
                && SessionTable::unbilled_in(s, start, end)
        }))
    }

    async fn find_unbilled_for_enterprise(
        &self,
        enterprise_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<ChargingSession>> {
        Ok(self.table.collect(|s| {
            s.owner.enterprise_id() == Some(enterprise_id)
                && s.enterprise_invoice_id.is_none()
                && SessionTable::unbilled_in(s, start, end)
        }))
    }

    async fn enterprises_with_unbilled(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DomainResult<Vec<i32>> {
        let mut ids: Vec<i32> = self
            .table
            .collect(|s| s.enterprise_invoice_id.is_none() && SessionTable::unbilled_in(s, start, end))
            .into_iter()
            .filter_map(|s| s.owner.enterprise_id())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}
