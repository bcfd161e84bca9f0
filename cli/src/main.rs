//! ChargeGrid CLI
//!
//! Headless billing and availability daemon, suitable for a systemd
//! service or a container.
//!
//! ```sh
//! # Run with default config (~/.config/chargegrid/config.toml)
//! chargegrid
//!
//! # Write a default config file and exit
//! chargegrid --init
//!
//! # Validate config without starting
//! chargegrid --check
//!
//! # Run one job now and exit
//! chargegrid --run-job monthly_billing
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use chargegrid::config::AppConfig;
use chargegrid::runtime::{init_tracing, Runtime, RuntimeOptions};
use chargegrid::Job;

/// ChargeGrid: EV charging availability, sessions and billing.
#[derive(Parser, Debug)]
#[command(
    name = "chargegrid",
    version,
    about = "Availability, charging-session and billing core for an EV charging network",
    long_about = "ChargeGrid runs the reservation, session and invoice lifecycle \
                  together with its periodic jobs (reservation expiry, monthly billing, \
                  overdue marking, suspension and reminders).\n\n\
                  Default config: ~/.config/chargegrid/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "CHARGEGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit.
    #[arg(long)]
    check: bool,

    /// Write the default configuration to the config path and exit.
    #[arg(long)]
    init: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Use in-memory storage instead of the database.
    #[arg(long)]
    in_memory: bool,

    /// Run a single job now and exit (reservation_expiry, registration_expiry,
    /// monthly_billing, overdue_sweep, suspension_sweep, reminder_sweep).
    #[arg(long, value_name = "JOB")]
    run_job: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .unwrap_or_else(chargegrid::default_config_path);

    if cli.init {
        AppConfig::default().save(&config_path)?;
        println!("Default configuration written to {}", config_path.display());
        return Ok(());
    }

    // ── Load configuration ─────────────────────────────────────
    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    if cli.check {
        if let Some(e) = load_error {
            eprintln!("Configuration is invalid: {}", e);
            std::process::exit(1);
        }
        println!("Configuration is valid");
        println!("   Config file  : {}", config_path.display());
        println!("   Database     : {}", config.database.url);
        println!("   Log level    : {}", config.logging.level);
        println!("   Billing day  : {}", config.billing.billing_day);
        println!("   Due / grace  : {} / {} days", config.billing.due_days, config.billing.grace_days);
        println!("   Scheduler    : {}", if config.scheduler.enabled { "enabled" } else { "disabled" });
        return Ok(());
    }

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    let one_shot = match cli.run_job.as_deref() {
        None => None,
        Some(name) => match Job::from_str(name) {
            Some(job) => Some(job),
            None => {
                let known: Vec<&str> = Job::ALL.iter().map(|j| j.as_str()).collect();
                return Err(format!("unknown job {:?}; expected one of {}", name, known.join(", ")).into());
            }
        },
    };

    let runtime = Runtime::start(RuntimeOptions {
        config,
        auto_migrate: !cli.no_migrate,
        in_memory: cli.in_memory,
        start_scheduler: one_shot.is_none(),
    })
    .await?;

    if let Some(job) = one_shot {
        let result = runtime.run_job(job).await;
        runtime.shutdown().await;
        let report = result?;
        println!(
            "{}: processed {}, succeeded {}, failed {}, skipped {}",
            report.job, report.processed, report.succeeded, report.failed, report.skipped
        );
        return Ok(());
    }

    runtime.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    runtime.shutdown_signal().wait().await;
    runtime.shutdown().await;

    Ok(())
}
