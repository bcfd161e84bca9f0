//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::account::AccountRepository;
use crate::domain::invoice::InvoiceRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;
use crate::domain::resource::ResourceRepository;
use crate::domain::session::SessionRepository;
use crate::domain::subscription::SubscriptionRepository;

use super::account_repository::SeaOrmAccountRepository;
use super::invoice_repository::SeaOrmInvoiceRepository;
use super::reservation_repository::SeaOrmReservationRepository;
use super::resource_repository::SeaOrmResourceRepository;
use super::session_repository::SeaOrmSessionRepository;
use super::subscription_repository::SeaOrmSubscriptionRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let point = repos.resources().find_point(12).await?;
/// let running = repos.sessions().find_charging_for_point(12).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    resources: SeaOrmResourceRepository,
    reservations: SeaOrmReservationRepository,
    sessions: SeaOrmSessionRepository,
    subscriptions: SeaOrmSubscriptionRepository,
    invoices: SeaOrmInvoiceRepository,
    accounts: SeaOrmAccountRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            resources: SeaOrmResourceRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            sessions: SeaOrmSessionRepository::new(db.clone()),
            subscriptions: SeaOrmSubscriptionRepository::new(db.clone()),
            invoices: SeaOrmInvoiceRepository::new(db.clone()),
            accounts: SeaOrmAccountRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn resources(&self) -> &dyn ResourceRepository {
        &self.resources
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }

    fn subscriptions(&self) -> &dyn SubscriptionRepository {
        &self.subscriptions
    }

    fn invoices(&self) -> &dyn InvoiceRepository {
        &self.invoices
    }

    fn accounts(&self) -> &dyn AccountRepository {
        &self.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use crate::domain::{
        AccountStatus, BillingPeriod, Charger, ChargingPoint, ChargingSession, DomainError,
        EnterpriseInvoice, EnterpriseLineItem, Facility, Invoice, InvoiceStatus, PlanBenefit,
        PlanRegistration, Reservation, ResourceRef, ResourceStatus, SessionOwner, SessionStatus,
        Station, SubscriptionPlan,
    };
    use crate::infrastructure::database::migrator::Migrator;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
    }

    async fn provider() -> SeaOrmRepositoryProvider {
        // One connection so every query sees the same in-memory database
        let mut opts = sea_orm::ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let repos = SeaOrmRepositoryProvider::new(db);
        let res = repos.resources();
        res.save_facility(Facility::new(1, "Central")).await.unwrap();
        res.save_station(Station::new(1, 1, "North")).await.unwrap();
        res.save_point(ChargingPoint::new(1, 1, "N-1", 3000)).await.unwrap();
        res.save_point(ChargingPoint::new(2, 1, "N-2", 3000)).await.unwrap();
        res.save_charger(Charger::new(1, 1, "CCS2")).await.unwrap();
        repos
    }

    fn completed(owner: SessionOwner, point_id: i32, ended: DateTime<Utc>) -> ChargingSession {
        let mut s = ChargingSession::new(owner, point_id, 20, ended - Duration::hours(1));
        s.status = SessionStatus::Completed;
        s.end_percentage = Some(80);
        s.kwh_used = Decimal::new(305, 1);
        s.cost = 76_500;
        s.ended_at = Some(ended);
        s
    }

    #[tokio::test]
    async fn resource_status_and_soft_delete() {
        let repos = provider().await;
        let res = repos.resources();

        res.update_status(ResourceRef::Point(1), ResourceStatus::Booked)
            .await
            .unwrap();
        res.mark_deleted(ResourceRef::Charger(1)).await.unwrap();

        assert_eq!(res.find_point(1).await.unwrap().unwrap().status, ResourceStatus::Booked);
        assert!(res.find_charger(1).await.unwrap().unwrap().deleted);
        assert_eq!(res.points_of_station(1).await.unwrap().len(), 2);
        assert!(matches!(
            res.update_status(ResourceRef::Station(99), ResourceStatus::Inactive).await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn save_point_is_an_upsert() {
        let repos = provider().await;
        let mut p = ChargingPoint::new(1, 1, "N-1 renamed", 3500);
        p.status = ResourceStatus::Maintenance;
        repos.resources().save_point(p.clone()).await.unwrap();
        assert_eq!(repos.resources().find_point(1).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn second_charging_session_on_point_is_a_conflict() {
        let repos = provider().await;
        let sessions = repos.sessions();
        let first = sessions
            .insert(ChargingSession::new(SessionOwner::Driver { driver_id: 10 }, 1, 20, at(2, 9)))
            .await
            .unwrap();
        assert!(first.id > 0);

        let err = sessions
            .insert(ChargingSession::new(SessionOwner::Driver { driver_id: 11 }, 1, 20, at(2, 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let err = sessions
            .insert(ChargingSession::new(SessionOwner::Driver { driver_id: 10 }, 2, 20, at(2, 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let fleet = SessionOwner::Enterprise {
            enterprise_id: 5,
            vehicle_id: 500,
        };
        let s = sessions.insert(ChargingSession::new(fleet, 2, 10, at(2, 9))).await.unwrap();
        assert_eq!(sessions.find_charging_for_vehicle(500).await.unwrap().map(|s| s.id), Some(s.id));
        assert_eq!(sessions.find_by_id(s.id).await.unwrap().unwrap().owner, fleet);
    }

    #[tokio::test]
    async fn invoice_links_sessions_once() {
        let repos = provider().await;
        let driver = SessionOwner::Driver { driver_id: 10 };
        let a = repos.sessions().insert(completed(driver, 1, at(10, 10))).await.unwrap();
        let b = repos.sessions().insert(completed(driver, 2, at(11, 10))).await.unwrap();
        assert_eq!(a.kwh_used, Decimal::new(305, 1));

        let period = BillingPeriod::month_of(at(1, 0));
        let unbilled = repos
            .sessions()
            .find_unbilled_for_driver(10, period.start, period.end)
            .await
            .unwrap();
        assert_eq!(unbilled.len(), 2);

        let issue = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let inv = Invoice::issue(10, period, 153_000, 0, vec![a.id, b.id], issue, Duration::days(7));
        let created = repos.invoices().create_with_sessions(inv.clone()).await.unwrap();
        assert_eq!(created.session_ids, vec![a.id, b.id]);
        assert_eq!(repos.sessions().find_by_id(a.id).await.unwrap().unwrap().invoice_id, Some(created.id));

        let err = repos.invoices().create_with_sessions(inv).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(repos.invoices().find_for_driver(10).await.unwrap().len(), 1);

        let mut cancelled = created.clone();
        cancelled.cancel(issue).unwrap();
        repos.invoices().cancel_and_release(cancelled).await.unwrap();
        assert_eq!(repos.sessions().find_by_id(b.id).await.unwrap().unwrap().invoice_id, None);
        let reloaded = repos.invoices().find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, InvoiceStatus::Cancelled);
        assert_eq!(reloaded.session_ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn enterprise_invoice_round_trips_lines() {
        let repos = provider().await;
        let fleet = SessionOwner::Enterprise {
            enterprise_id: 5,
            vehicle_id: 500,
        };
        let s = repos.sessions().insert(completed(fleet, 1, at(12, 10))).await.unwrap();

        let period = BillingPeriod::month_of(at(1, 0));
        assert_eq!(
            repos.sessions().enterprises_with_unbilled(period.start, period.end).await.unwrap(),
            vec![5]
        );

        let lines = vec![EnterpriseLineItem {
            vehicle_id: 500,
            session_count: 1,
            kwh_used: Decimal::new(305, 1),
            amount: 76_250,
        }];
        let inv = EnterpriseInvoice::issue(5, period, lines.clone(), vec![s.id], period.end, Duration::days(7));
        let created = repos.invoices().create_enterprise_with_sessions(inv).await.unwrap();

        let found = repos.invoices().find_enterprise(created.id).await.unwrap().unwrap();
        assert_eq!(found.lines, lines);
        assert_eq!(found.total_cost, 76_250);
        assert!(repos
            .sessions()
            .enterprises_with_unbilled(period.start, period.end)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn plans_registrations_and_accounts() {
        let repos = provider().await;
        let subs = repos.subscriptions();
        let plan = SubscriptionPlan::new(1, "Basic", 50_000, 30)
            .with_benefit(PlanBenefit::ChargingDiscount { percent: Decimal::new(125, 1) })
            .with_benefit(PlanBenefit::SessionFeeWaiver);
        subs.save_plan(plan.clone()).await.unwrap();
        subs.save_plan(plan.clone()).await.unwrap();
        assert_eq!(subs.find_plan(1).await.unwrap(), Some(plan));

        let mut reg = subs
            .insert_registration(PlanRegistration::new(10, 1, at(1, 0)))
            .await
            .unwrap();
        reg.activate(at(1, 0), 30).unwrap();
        subs.update_registration(reg.clone()).await.unwrap();
        assert_eq!(subs.find_active_registrations_for_driver(10).await.unwrap(), vec![reg.clone()]);
        assert!(subs.find_expired_registrations(at(31, 0)).await.unwrap().is_empty());
        let after = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(subs.find_expired_registrations(after).await.unwrap().len(), 1);

        // Lapsed registrations still count for the period they covered.
        reg.expire().unwrap();
        subs.update_registration(reg.clone()).await.unwrap();
        let overlapping = subs.find_registrations_overlapping(at(15, 0), after).await.unwrap();
        assert_eq!(overlapping, vec![reg.clone()]);
        let march = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert!(subs.find_registrations_overlapping(after, march).await.unwrap().is_empty());
        let pending = subs
            .insert_registration(PlanRegistration::new(11, 1, at(2, 0)))
            .await
            .unwrap();
        assert!(!subs
            .find_registrations_overlapping(at(1, 0), after)
            .await
            .unwrap()
            .contains(&pending));

        assert_eq!(repos.accounts().status(10).await.unwrap(), AccountStatus::Active);
        repos.accounts().set_status(10, AccountStatus::Suspended).await.unwrap();
        assert_eq!(repos.accounts().status(10).await.unwrap(), AccountStatus::Suspended);
        repos.accounts().set_status(10, AccountStatus::Active).await.unwrap();
        assert_eq!(repos.accounts().status(10).await.unwrap(), AccountStatus::Active);
    }

    #[tokio::test]
    async fn reservations_by_point_and_expiry() {
        let repos = provider().await;
        let r = repos
            .reservations()
            .insert(Reservation::new(10, 1, None, at(3, 10), Duration::minutes(30)).unwrap())
            .await
            .unwrap();
        assert_eq!(repos.reservations().find_active_for_point(1).await.unwrap(), vec![r.clone()]);
        assert!(repos.reservations().find_expired(at(3, 10)).await.unwrap().is_empty());
        assert_eq!(repos.reservations().find_expired(at(3, 11)).await.unwrap().len(), 1);

        let mut cancelled = r.clone();
        cancelled.cancel().unwrap();
        repos.reservations().update(cancelled).await.unwrap();
        assert!(repos.reservations().find_active_for_point(1).await.unwrap().is_empty());
        assert_eq!(repos.reservations().find_for_driver(10).await.unwrap().len(), 1);
    }
}
