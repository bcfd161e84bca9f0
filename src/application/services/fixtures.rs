//! Shared test setup: a small network on the in-memory provider

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::application::ports::Notifier;
use crate::application::Services;
use crate::domain::{
    Charger, ChargingPoint, ChargingSession, Facility, PlanBenefit, PlanRegistration,
    RepositoryProvider, Station, SubscriptionPlan,
};
use crate::infrastructure::storage::InMemoryRepositoryProvider;
use crate::notifications::Event;

use super::{BillingPolicy, PricingPolicy, StartRequest};

/// 15% discount, 50 000 per period, 30 days
pub const BASIC_PLAN: i32 = 1;
/// 15% discount, fee waiver, 15 grace minutes, 100 000 per period, 30 days
pub const PREMIUM_PLAN: i32 = 2;
/// No longer offered
pub const RETIRED_PLAN: i32 = 3;

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<Event>>,
}

impl RecordingNotifier {
    pub fn count(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

/// Facility 1 with station 1 (points 1 and 2 at 3000/kWh) and station 2
/// (point 3 at 4000/kWh); charger `n` sits on point `n`.
pub struct Fixture {
    pub repos: Arc<InMemoryRepositoryProvider>,
    pub notifier: Arc<RecordingNotifier>,
    pub services: Services,
}

impl Fixture {
    pub async fn new() -> Self {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let res = repos.resources();
        res.save_facility(Facility::new(1, "Central")).await.unwrap();
        res.save_station(Station::new(1, 1, "North")).await.unwrap();
        res.save_station(Station::new(2, 1, "South")).await.unwrap();
        res.save_point(ChargingPoint::new(1, 1, "N-1", 3000)).await.unwrap();
        res.save_point(ChargingPoint::new(2, 1, "N-2", 3000)).await.unwrap();
        res.save_point(ChargingPoint::new(3, 2, "S-1", 4000)).await.unwrap();
        for id in 1..=3 {
            res.save_charger(Charger::new(id, id, "CCS2")).await.unwrap();
        }

        let subs = repos.subscriptions();
        let discount = PlanBenefit::ChargingDiscount {
            percent: Decimal::from(15),
        };
        subs.save_plan(SubscriptionPlan::new(BASIC_PLAN, "Basic", 50_000, 30).with_benefit(discount.clone()))
            .await
            .unwrap();
        subs.save_plan(
            SubscriptionPlan::new(PREMIUM_PLAN, "Premium", 100_000, 30)
                .with_benefit(discount)
                .with_benefit(PlanBenefit::SessionFeeWaiver)
                .with_benefit(PlanBenefit::OveruseGraceTime { minutes: 15 }),
        )
        .await
        .unwrap();
        let mut retired = SubscriptionPlan::new(RETIRED_PLAN, "Legacy", 10_000, 30);
        retired.is_active = false;
        subs.save_plan(retired).await.unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let services = Services::new(
            repos.clone(),
            notifier.clone(),
            PricingPolicy {
                enterprise_rate_per_kwh: 2500,
                overuse_rate_per_minute: 1000,
            },
            BillingPolicy {
                due_days: 7,
                grace_days: 7,
                reminder_lead_days: 2,
                session_fee: 2000,
            },
        );

        Self {
            repos,
            notifier,
            services,
        }
    }

    /// Register and activate in one go.
    pub async fn subscribe(&self, driver_id: i32, plan_id: i32, from: DateTime<Utc>) -> PlanRegistration {
        let reg = self.services.plans.register(driver_id, plan_id, from).await.unwrap();
        self.services.plans.activate(reg.id, from).await.unwrap()
    }

    /// Start at `from` and stop an hour later at `end_percentage`.
    pub async fn charge(&self, request: StartRequest, end_percentage: i32, from: DateTime<Utc>) -> ChargingSession {
        let session = self.services.sessions.start(request, from).await.unwrap();
        self.services
            .sessions
            .stop(session.id, end_percentage, None, from + Duration::hours(1))
            .await
            .unwrap()
    }
}
