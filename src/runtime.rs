//! Process runtime
//!
//! [`Runtime`] owns the full lifecycle: metrics recorder, storage (with
//! migrations), services, the notification relay and the job scheduler,
//! plus graceful shutdown. The CLI and tests both start it the same way.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::application::ports::Notifier;
use crate::application::{Job, JobReport, Scheduler, Services};
use crate::config::{AppConfig, MetricsConfig};
use crate::domain::{DomainResult, RepositoryProvider};
use crate::infrastructure::{
    init_database, run_migrations, InMemoryRepositoryProvider, SeaOrmRepositoryProvider,
};
use crate::notifications::{create_event_bus, SharedEventBus};
use crate::shared::{AppError, InfraError, ShutdownCoordinator, ShutdownSignal};

// ── Options ────────────────────────────────────────────────────────

pub struct RuntimeOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Use the in-memory repositories instead of the database.
    pub in_memory: bool,
    /// Spawn the periodic jobs (default: true; one-shot runs turn it off).
    pub start_scheduler: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            in_memory: false,
            start_scheduler: true,
        }
    }
}

// ── Runtime ────────────────────────────────────────────────────────

/// Handle to a running charging core.
///
/// ```rust,no_run
/// use chargegrid::runtime::{Runtime, RuntimeOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runtime = Runtime::start(RuntimeOptions::default()).await?;
///     runtime.install_signal_handler();
///     runtime.shutdown_signal().wait().await;
///     runtime.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct Runtime {
    pub services: Services,
    pub repos: Arc<dyn RepositoryProvider>,
    pub event_bus: SharedEventBus,
    pub scheduler: Scheduler,
    pub config: AppConfig,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    tasks: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Start the core:
    /// 1. Install the Prometheus recorder
    /// 2. Open storage and run migrations
    /// 3. Wire services over the event bus
    /// 4. Start the notification relay and, if enabled, the scheduled jobs
    pub async fn start(opts: RuntimeOptions) -> Result<Self, AppError> {
        let config = opts.config;
        info!("Starting ChargeGrid core...");

        install_metrics(&config.metrics);

        // ── Storage ────────────────────────────────────────────
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            if opts.in_memory {
                info!("Using in-memory repositories; nothing will be persisted");
                (Arc::new(InMemoryRepositoryProvider::new()), None)
            } else {
                let db = init_database(&config.database)
                    .await
                    .map_err(InfraError::from)?;
                if opts.auto_migrate {
                    run_migrations(&db).await.map_err(InfraError::from)?;
                }
                (Arc::new(SeaOrmRepositoryProvider::new(db.clone())), Some(db))
            };

        // ── Services ───────────────────────────────────────────
        let event_bus = create_event_bus();
        let notifier: Arc<dyn Notifier> = event_bus.clone();
        let services = Services::new(
            repos.clone(),
            notifier,
            config.pricing_policy(),
            config.billing_policy(),
        );
        let scheduler = Scheduler::new(services.clone(), config.schedule_settings());

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownCoordinator::new(config.scheduler.shutdown_timeout_secs);
        let signal = shutdown.signal();

        let mut tasks = vec![event_bus.spawn_log_relay(signal.clone())];
        if opts.start_scheduler && config.scheduler.enabled {
            tasks.extend(scheduler.start(signal));
            info!("Scheduler started");
        } else {
            info!("Scheduler disabled");
        }

        info!("ChargeGrid core started");

        Ok(Self {
            services,
            repos,
            event_bus,
            scheduler,
            config,
            db,
            shutdown,
            tasks,
        })
    }

    /// Run one job now, outside the schedule.
    pub async fn run_job(&self, job: Job) -> DomainResult<JobReport> {
        self.scheduler.run_job(job, Utc::now()).await
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Stop the background tasks, then close the database.
    pub async fn shutdown(self) {
        info!("Shutting down ChargeGrid core...");
        self.shutdown.drain(self.tasks).await;

        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        }

        info!("ChargeGrid shutdown complete");
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Install the global Prometheus recorder.
///
/// The recorder can only be installed once per process; later calls reuse
/// the first one.
pub fn install_metrics(config: &MetricsConfig) -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let Some(listen) = config.listen.as_deref() else {
                return match builder.install_recorder() {
                    Ok(handle) => {
                        info!("Prometheus metrics recorder installed");
                        Some(handle)
                    }
                    Err(e) => {
                        warn!("Failed to install Prometheus recorder: {}", e);
                        None
                    }
                };
            };

            let addr: std::net::SocketAddr = match listen.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    warn!("Invalid metrics.listen {:?}: {}; metrics disabled", listen, e);
                    return None;
                }
            };
            match builder.with_http_listener(addr).install() {
                Ok(()) => info!("Prometheus metrics exposed on http://{}/metrics", addr),
                Err(e) => warn!("Failed to start Prometheus exporter: {}", e),
            }
            None
        })
        .clone()
}

/// Initialize tracing (logging) from the application config.
///
/// `RUST_LOG` takes precedence over `logging.level`. Call once at process
/// startup, before [`Runtime::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChargingPoint, Facility, Station};
    use crate::application::StartRequest;

    fn in_memory() -> RuntimeOptions {
        RuntimeOptions {
            in_memory: true,
            ..RuntimeOptions::default()
        }
    }

    #[tokio::test]
    async fn in_memory_runtime_starts_and_stops() {
        let runtime = Runtime::start(in_memory()).await.unwrap();
        let res = runtime.repos.resources();
        res.save_facility(Facility::new(1, "Central")).await.unwrap();
        res.save_station(Station::new(1, 1, "North")).await.unwrap();
        res.save_point(ChargingPoint::new(1, 1, "N-1", 3000)).await.unwrap();

        let session = runtime
            .services
            .sessions
            .start(StartRequest::driver(10, 1, 20), Utc::now())
            .await
            .unwrap();
        assert!(session.is_charging());

        let report = runtime.run_job(Job::ReservationExpiry).await.unwrap();
        assert!(report.is_clean());

        tokio::time::timeout(std::time::Duration::from_secs(5), runtime.shutdown())
            .await
            .expect("shutdown hung");
    }

    #[tokio::test]
    async fn sqlite_runtime_runs_migrations() {
        let mut opts = RuntimeOptions {
            start_scheduler: false,
            ..RuntimeOptions::default()
        };
        opts.config.database.url = "sqlite::memory:".into();
        opts.config.database.max_connections = 1;

        let runtime = Runtime::start(opts).await.unwrap();
        assert!(runtime.repos.resources().find_point(1).await.unwrap().is_none());
        runtime.shutdown().await;
    }
}
