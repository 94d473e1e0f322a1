use serde::Deserialize;
use std::{fs, time::Duration};

use crate::sources::WindowPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,
    #[serde(default = "default_initial_lookback_months")]
    pub initial_lookback_months: u32,
    #[serde(default = "default_periodic_lookback_months")]
    pub periodic_lookback_months: u32,
}

fn default_interval_hours() -> u64 {
    6
}

fn default_initial_lookback_months() -> u32 {
    12
}

fn default_periodic_lookback_months() -> u32 {
    1
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            initial_lookback_months: default_initial_lookback_months(),
            periodic_lookback_months: default_periodic_lookback_months(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.max(1) * 3600)
    }

    pub fn window_policy(&self) -> WindowPolicy {
        WindowPolicy {
            initial_lookback_months: self.initial_lookback_months,
            periodic_lookback_months: self.periodic_lookback_months,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub account_file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatisticsConfig {
    pub output_path: String,
    /// Defaults to `sensor.<entry_id>`.
    pub statistic_prefix: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitiesConfig {
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub entry_id: String,
    #[serde(default)]
    pub refresh: RefreshConfig,
    pub source: SourceConfig,
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub entities: EntitiesConfig,
    pub control: Option<ControlConfig>,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("CONSUMPTION_CONFIG").unwrap_or_else(|_| "consumption-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {path}: {e}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn statistic_prefix(&self) -> String {
        self.statistics
            .statistic_prefix
            .clone()
            .unwrap_or_else(|| format!("sensor.{}", self.entry_id))
    }
}
