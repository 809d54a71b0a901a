use serde::Deserialize;
use std::env;
use surgefare_core::SurgePolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: Option<DatabaseConfig>,
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub pricing: PricingRules,
    #[serde(default)]
    pub booking: BookingRules,
    pub ticketing: TicketingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PricingRules {
    #[serde(default = "default_threshold")]
    pub surge_threshold: u64,
    #[serde(default = "default_window")]
    pub attempt_window_seconds: u64,
    #[serde(default = "default_percent")]
    pub surge_percent: u32,
    #[serde(default = "default_surge_duration")]
    pub surge_duration_seconds: u64,
    #[serde(default = "default_retention")]
    pub attempt_retention_seconds: u64,
    #[serde(default = "default_purge_interval")]
    pub purge_interval_seconds: u64,
}

fn default_threshold() -> u64 { 3 }
fn default_window() -> u64 { 300 }
fn default_percent() -> u32 { 10 }
fn default_surge_duration() -> u64 { 600 }
fn default_retention() -> u64 { 3600 }
fn default_purge_interval() -> u64 { 300 }

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            surge_threshold: default_threshold(),
            attempt_window_seconds: default_window(),
            surge_percent: default_percent(),
            surge_duration_seconds: default_surge_duration(),
            attempt_retention_seconds: default_retention(),
            purge_interval_seconds: default_purge_interval(),
        }
    }
}

impl PricingRules {
    pub fn surge_policy(&self) -> SurgePolicy {
        SurgePolicy {
            attempt_threshold: self.surge_threshold,
            attempt_window: seconds(self.attempt_window_seconds),
            surge_percent: self.surge_percent,
            surge_duration: seconds(self.surge_duration_seconds),
        }
    }

    /// How long attempts are kept. Never shorter than the counting window,
    /// otherwise purging would change surge decisions.
    pub fn attempt_retention(&self) -> chrono::Duration {
        seconds(self.attempt_retention_seconds.max(self.attempt_window_seconds))
    }

    pub fn purge_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(capped_seconds(self.purge_interval_seconds).max(1))
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BookingRules {
    #[serde(default = "default_issue_attempts")]
    pub issue_attempts: u32,
    #[serde(default = "default_issue_timeout")]
    pub issue_timeout_seconds: u64,
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_seconds: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Consecutive issuer failures before booking requests are refused.
    #[serde(default = "default_breaker_threshold")]
    pub breaker_failure_threshold: usize,
    #[serde(default = "default_breaker_reset")]
    pub breaker_reset_seconds: u64,
}

impl BookingRules {
    pub fn hold_ttl(&self) -> chrono::Duration {
        seconds(self.hold_ttl_seconds)
    }

    pub fn issue_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(capped_seconds(self.issue_timeout_seconds))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(capped_seconds(self.sweep_interval_seconds).max(1))
    }

    pub fn breaker_reset(&self) -> std::time::Duration {
        std::time::Duration::from_secs(capped_seconds(self.breaker_reset_seconds))
    }
}

fn default_issue_attempts() -> u32 { 2 }
fn default_issue_timeout() -> u64 { 10 }
fn default_hold_ttl() -> u64 { 120 }
fn default_sweep_interval() -> u64 { 30 }
fn default_breaker_threshold() -> usize { 5 }
fn default_breaker_reset() -> u64 { 30 }

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            issue_attempts: default_issue_attempts(),
            issue_timeout_seconds: default_issue_timeout(),
            hold_ttl_seconds: default_hold_ttl(),
            sweep_interval_seconds: default_sweep_interval(),
            breaker_failure_threshold: default_breaker_threshold(),
            breaker_reset_seconds: default_breaker_reset(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// JSON file with `flights` and `users` loaded into the memory backend.
    pub fixtures: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TicketingConfig {
    pub base_url: String,
    #[serde(default = "default_folder")]
    pub folder: String,
}

fn default_folder() -> String { "flight_tickets".to_string() }

/// Longest duration any setting may express (ten years). Larger values are
/// capped so timestamp arithmetic on them cannot overflow.
const MAX_DURATION_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

fn capped_seconds(secs: u64) -> u64 {
    secs.min(MAX_DURATION_SECONDS)
}

fn seconds(secs: u64) -> chrono::Duration {
    // Capped value always fits in i64.
    chrono::Duration::seconds(capped_seconds(secs) as i64)
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. SURGEFARE_PRICING__SURGE_PERCENT=15
            .add_source(
                config::Environment::with_prefix("SURGEFARE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        s.try_deserialize()
    }
}
