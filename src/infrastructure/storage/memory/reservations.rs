use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::domain::{DomainError, DomainResult, Reservation, ReservationRepository};

pub struct InMemoryReservationRepository {
    rows: DashMap<i32, Reservation>,
    next_id: AtomicI32,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI32::new(1),
        }
    }

    fn collect(&self, filter: impl Fn(&Reservation) -> bool) -> Vec<Reservation> {
        let mut found: Vec<Reservation> = self
            .rows
            .iter()
            .filter(|r| filter(r.value()))
            .map(|r| r.value().clone())
            .collect();
        found.sort_by_key(|r| (r.start_time, r.id));
        found
    }
}

impl Default for InMemoryReservationRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn insert(&self, mut reservation: Reservation) -> DomainResult<Reservation> {
        reservation.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.rows.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        Ok(self.rows.get(&id).map(|r| r.clone()))
    }

    async fn update(&self, reservation: Reservation) -> DomainResult<()> {
        match self.rows.get_mut(&reservation.id) {
            Some(mut row) => {
                *row = reservation;
                Ok(())
            }
            None => Err(DomainError::not_found("Reservation", reservation.id)),
        }
    }

    async fn find_active_for_point(&self, point_id: i32) -> DomainResult<Vec<Reservation>> {
        Ok(self.collect(|r| r.point_id == point_id && r.is_active()))
    }

    async fn find_active_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Reservation>> {
        Ok(self.collect(|r| r.driver_id == driver_id && r.is_active()))
    }

    async fn find_expired(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        Ok(self.collect(|r| r.is_overdue(now)))
    }

    async fn find_for_driver(&self, driver_id: i32) -> DomainResult<Vec<Reservation>> {
        let mut found = self.collect(|r| r.driver_id == driver_id);
        found.reverse();
        Ok(found)
    }
}
