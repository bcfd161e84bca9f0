//! Configuration module
//!
//! TOML file (default `~/.config/chargegrid/config.toml`); every field has a
//! default so a partial file is enough.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::application::{BillingPolicy, PricingPolicy, ScheduleSettings};
use crate::infrastructure::DatabaseConfig;
use crate::shared::InfraError;

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "CHARGEGRID_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `chargegrid=debug,sea_orm=warn`
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Money amounts are whole currency units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Flat price per kWh for enterprise fleet sessions
    pub enterprise_rate_per_kwh: i64,
    /// Per-session fee added on driver invoices unless waived by the plan
    pub session_fee: i64,
    /// Charged per minute a session runs past its reservation
    pub overuse_rate_per_minute: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        let pricing = PricingPolicy::default();
        Self {
            enterprise_rate_per_kwh: pricing.enterprise_rate_per_kwh,
            session_fee: BillingPolicy::default().session_fee,
            overuse_rate_per_minute: pricing.overuse_rate_per_minute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    pub due_days: i64,
    pub grace_days: i64,
    pub reminder_lead_days: i64,
    /// Day of month on which monthly invoices are generated (1..=28)
    pub billing_day: u32,
}

impl Default for BillingConfig {
    fn default() -> Self {
        let policy = BillingPolicy::default();
        Self {
            due_days: policy.due_days,
            grace_days: policy.grace_days,
            reminder_lead_days: policy.reminder_lead_days,
            billing_day: ScheduleSettings::default().billing_day,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub reservation_sweep_secs: u64,
    pub daily_sweep_secs: u64,
    /// How long shutdown waits for a running job
    pub shutdown_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let schedule = ScheduleSettings::default();
        Self {
            enabled: true,
            reservation_sweep_secs: schedule.reservation_sweep_secs,
            daily_sweep_secs: schedule.daily_sweep_secs,
            shutdown_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus scrape endpoint, e.g. `0.0.0.0:9100`; unset keeps metrics in-process
    pub listen: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub pricing: PricingConfig,
    pub billing: BillingConfig,
    pub scheduler: SchedulerConfig,
    pub metrics: MetricsConfig,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| InfraError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, InfraError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| InfraError::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), InfraError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| InfraError::Config(format!("{}: {}", parent.display(), e)))?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| InfraError::Config(format!("cannot serialize config: {}", e)))?;
        std::fs::write(path, raw)
            .map_err(|e| InfraError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<(), InfraError> {
        let fail = |msg: String| Err(InfraError::Config(msg));

        if self.database.url.trim().is_empty() {
            return fail("database.url is empty".into());
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "text" | "json") {
            return fail(format!("logging.format must be text or json, got {:?}", self.logging.format));
        }
        let p = &self.pricing;
        if p.enterprise_rate_per_kwh < 0 || p.session_fee < 0 || p.overuse_rate_per_minute < 0 {
            return fail("pricing amounts must not be negative".into());
        }
        let b = &self.billing;
        if b.due_days < 0 || b.grace_days < 0 || b.reminder_lead_days < 0 {
            return fail("billing day counts must not be negative".into());
        }
        if !(1..=28).contains(&b.billing_day) {
            return fail(format!("billing.billing_day must be 1..=28, got {}", b.billing_day));
        }
        if self.scheduler.reservation_sweep_secs == 0 || self.scheduler.daily_sweep_secs == 0 {
            return fail("scheduler intervals must be positive".into());
        }
        Ok(())
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            enterprise_rate_per_kwh: self.pricing.enterprise_rate_per_kwh,
            overuse_rate_per_minute: self.pricing.overuse_rate_per_minute,
        }
    }

    pub fn billing_policy(&self) -> BillingPolicy {
        BillingPolicy {
            due_days: self.billing.due_days,
            grace_days: self.billing.grace_days,
            reminder_lead_days: self.billing.reminder_lead_days,
            session_fee: self.pricing.session_fee,
        }
    }

    pub fn schedule_settings(&self) -> ScheduleSettings {
        ScheduleSettings {
            reservation_sweep_secs: self.scheduler.reservation_sweep_secs,
            daily_sweep_secs: self.scheduler.daily_sweep_secs,
            billing_day: self.billing.billing_day,
        }
    }
}

/// `$CHARGEGRID_CONFIG`, else `<user config dir>/chargegrid/config.toml`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return PathBuf::from(path);
    }
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chargegrid")
        .join("config.toml")
}
