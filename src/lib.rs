//! # ChargeGrid
//!
//! Availability, charging-session and billing core for an EV charging
//! network.
//!
//! ## Architecture
//!
//! - **domain**: entities, status machines and repository traits
//! - **application**: services (resource registry, reservations, sessions,
//!   subscriptions, billing) and the job scheduler
//! - **infrastructure**: SeaORM and in-memory repository providers
//! - **notifications**: fire-and-forget event bus
//! - **runtime**: process wiring, logging, metrics and shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod notifications;
pub mod runtime;
pub mod shared;

pub use config::{default_config_path, AppConfig};

pub use application::{Job, JobReport, Scheduler, Services};

// Re-export database types for easy access
pub use infrastructure::{
    init_database, run_migrations, DatabaseConfig, InMemoryRepositoryProvider,
    SeaOrmRepositoryProvider,
};

pub use notifications::{create_event_bus, Event, EventBus, SharedEventBus};
