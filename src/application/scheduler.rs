//! Periodic jobs
//!
//! Each job is its own tokio task ticking on an interval. A run completes
//! before the next tick is taken, so a job never overlaps itself; different
//! jobs may run at the same time and only meet in storage.

use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::application::report::JobReport;
use crate::application::Services;
use crate::domain::{BillingPeriod, DomainResult};
use crate::shared::ShutdownSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    ReservationExpiry,
    RegistrationExpiry,
    /// Driver and enterprise invoices for the previous calendar month
    MonthlyBilling,
    OverdueSweep,
    SuspensionSweep,
    ReminderSweep,
}

impl Job {
    pub const ALL: [Job; 6] = [
        Job::ReservationExpiry,
        Job::RegistrationExpiry,
        Job::MonthlyBilling,
        Job::OverdueSweep,
        Job::SuspensionSweep,
        Job::ReminderSweep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Job::ReservationExpiry => "reservation_expiry",
            Job::RegistrationExpiry => "registration_expiry",
            Job::MonthlyBilling => "monthly_billing",
            Job::OverdueSweep => "overdue_sweep",
            Job::SuspensionSweep => "suspension_sweep",
            Job::ReminderSweep => "reminder_sweep",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|job| job.as_str() == s)
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    pub reservation_sweep_secs: u64,
    /// Cadence of the overdue, suspension, reminder and registration sweeps
    pub daily_sweep_secs: u64,
    /// Day of month (UTC) on which monthly billing acts
    pub billing_day: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            reservation_sweep_secs: 300,
            daily_sweep_secs: 86_400,
            billing_day: 1,
        }
    }
}

#[derive(Clone)]
pub struct Scheduler {
    services: Services,
    settings: ScheduleSettings,
}

impl Scheduler {
    pub fn new(services: Services, settings: ScheduleSettings) -> Self {
        Self { services, settings }
    }

    /// Run one job to completion at `now`.
    ///
    /// Monthly billing bills the calendar month before `now` whatever the
    /// day; the periodic loop is what restricts it to the billing day.
    pub async fn run_job(&self, job: Job, now: DateTime<Utc>) -> DomainResult<JobReport> {
        debug!(job = job.as_str(), %now, "Running job");
        match job {
            Job::ReservationExpiry => self.services.reservations.sweep_expired(now).await,
            Job::RegistrationExpiry => self.services.plans.sweep_expired(now).await,
            Job::MonthlyBilling => {
                let period = BillingPeriod::previous_month(now);
                let mut report = self.services.billing.generate_invoices(period, now).await?;
                report.merge(self.services.billing.generate_enterprise_invoices(period, now).await?);
                Ok(report)
            }
            Job::OverdueSweep => self.services.billing.mark_overdue(now).await,
            Job::SuspensionSweep => self.services.billing.suspend_overdue_accounts(now).await,
            Job::ReminderSweep => self.services.billing.send_due_reminders(now).await,
        }
    }

    /// Whether the periodic loop should run `job` at this tick.
    pub fn is_due(&self, job: Job, now: DateTime<Utc>) -> bool {
        match job {
            Job::MonthlyBilling => now.day() == self.settings.billing_day,
            _ => true,
        }
    }

    fn period_of(&self, job: Job) -> Duration {
        let secs = match job {
            Job::ReservationExpiry => self.settings.reservation_sweep_secs,
            _ => self.settings.daily_sweep_secs,
        };
        Duration::from_secs(secs.max(1))
    }

    /// Spawn one task per job; each stops when `shutdown` fires.
    pub fn start(&self, shutdown: ShutdownSignal) -> Vec<JoinHandle<()>> {
        Job::ALL
            .into_iter()
            .map(|job| self.spawn_job(job, shutdown.clone()))
            .collect()
    }

    fn spawn_job(&self, job: Job, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let scheduler = self.clone();
        let period = self.period_of(job);

        tokio::spawn(async move {
            info!(job = job.as_str(), every_secs = period.as_secs(), "Scheduled job started");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = Utc::now();
                        if !scheduler.is_due(job, now) {
                            continue;
                        }
                        if let Err(e) = scheduler.run_job(job, now).await {
                            warn!(job = job.as_str(), error = %e, "Job run failed");
                        }
                    }
                    _ = shutdown.wait() => break,
                }
            }

            info!(job = job.as_str(), "Scheduled job stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::fixtures::{at, Fixture, BASIC_PLAN};
    use crate::application::services::StartRequest;
    use crate::domain::{AccountStatus, InvoiceStatus, RepositoryProvider};

    fn scheduler(fx: &Fixture) -> Scheduler {
        Scheduler::new(fx.services.clone(), ScheduleSettings::default())
    }

    #[test]
    fn job_names_round_trip() {
        for job in Job::ALL {
            assert_eq!(Job::from_str(job.as_str()), Some(job));
        }
        assert_eq!(Job::from_str("weekly_billing"), None);
    }

    #[tokio::test]
    async fn monthly_billing_only_due_on_billing_day() {
        let fx = Fixture::new().await;
        let s = scheduler(&fx);
        assert!(s.is_due(Job::MonthlyBilling, at(2025, 2, 1, 3, 0)));
        assert!(!s.is_due(Job::MonthlyBilling, at(2025, 2, 2, 3, 0)));
        assert!(s.is_due(Job::OverdueSweep, at(2025, 2, 2, 3, 0)));
    }

    #[tokio::test]
    async fn jobs_drive_the_billing_cycle() {
        let fx = Fixture::new().await;
        let s = scheduler(&fx);
        fx.subscribe(10, BASIC_PLAN, at(2024, 12, 5, 0, 0)).await;
        fx.charge(StartRequest::driver(10, 1, 20), 80, at(2024, 12, 10, 9, 0)).await;
        fx.charge(StartRequest::fleet(5, 500, 2, 10), 30, at(2024, 12, 11, 9, 0)).await;

        let billing = s.run_job(Job::MonthlyBilling, at(2025, 1, 1, 0, 0)).await.unwrap();
        assert_eq!(billing.succeeded, 2);

        s.run_job(Job::OverdueSweep, at(2025, 1, 9, 0, 0)).await.unwrap();
        let invoices = fx.services.billing.invoices_for_driver(10).await.unwrap();
        assert_eq!(invoices[0].status, InvoiceStatus::Overdue);

        s.run_job(Job::SuspensionSweep, at(2025, 1, 16, 0, 0)).await.unwrap();
        assert_eq!(fx.repos.accounts().status(10).await.unwrap(), AccountStatus::Suspended);
    }

    #[tokio::test]
    async fn started_tasks_stop_on_shutdown() {
        let fx = Fixture::new().await;
        let shutdown = ShutdownSignal::new();
        let handles = scheduler(&fx).start(shutdown.clone());
        assert_eq!(handles.len(), Job::ALL.len());

        shutdown.trigger();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("job task did not stop")
                .unwrap();
        }
    }
}
