//! Application configuration.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

/// Age at which a student may pay for their own enrollment.
pub const DEFAULT_ADULT_AGE: u32 = 18;

/// Days a parent registration stays claimable.
pub const DEFAULT_REGISTRATION_EXPIRY_DAYS: i64 = 7;

/// Attempts made to find a free business code before giving up.
pub const DEFAULT_CODE_RETRY_CAP: u32 = 5;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Enrollment policy configuration.
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
    /// Maintenance scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Enrollment workflow policy.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentConfig {
    /// Minimum age (in whole years) treated as an adult by routing.
    #[serde(default = "default_adult_age")]
    pub adult_age: u32,
    /// Fallback price when a course has no 3x weekly price.
    #[serde(default = "default_price_3x_weekly")]
    pub default_price_3x_weekly: Decimal,
    /// Fallback price when a course has no 5x weekly price.
    #[serde(default = "default_price_5x_weekly")]
    pub default_price_5x_weekly: Decimal,
    /// Currency used when a course does not specify one.
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Days before a parent registration expires.
    #[serde(default = "default_registration_expiry_days")]
    pub registration_expiry_days: i64,
    /// Maximum attempts when generating a unique business code.
    #[serde(default = "default_code_retry_cap")]
    pub code_retry_cap: u32,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            adult_age: default_adult_age(),
            default_price_3x_weekly: default_price_3x_weekly(),
            default_price_5x_weekly: default_price_5x_weekly(),
            default_currency: default_currency(),
            registration_expiry_days: default_registration_expiry_days(),
            code_retry_cap: default_code_retry_cap(),
        }
    }
}

/// Maintenance scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the periodic sweeps run inside the server process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds between subscription expiry sweeps.
    #[serde(default = "default_subscription_sweep_secs")]
    pub subscription_sweep_secs: u64,
    /// Seconds between parent registration expiry sweeps.
    #[serde(default = "default_registration_sweep_secs")]
    pub registration_sweep_secs: u64,
    /// Window (days) for "expiring soon" notices.
    #[serde(default = "default_expiring_within_days")]
    pub expiring_within_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            subscription_sweep_secs: default_subscription_sweep_secs(),
            registration_sweep_secs: default_registration_sweep_secs(),
            expiring_within_days: default_expiring_within_days(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    50
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_adult_age() -> u32 {
    DEFAULT_ADULT_AGE
}

fn default_price_3x_weekly() -> Decimal {
    Decimal::new(80, 0)
}

fn default_price_5x_weekly() -> Decimal {
    Decimal::new(120, 0)
}

fn default_currency() -> String {
    "USD".to_string()
}

const fn default_registration_expiry_days() -> i64 {
    DEFAULT_REGISTRATION_EXPIRY_DAYS
}

const fn default_code_retry_cap() -> u32 {
    DEFAULT_CODE_RETRY_CAP
}

const fn default_subscription_sweep_secs() -> u64 {
    3600
}

const fn default_registration_sweep_secs() -> u64 {
    3600
}

const fn default_expiring_within_days() -> i64 {
    7
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `ACADEMY_ENV`)
    /// 4. Environment variables with `ACADEMY__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("ACADEMY_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("ACADEMY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("ACADEMY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_defaults() {
        let config = EnrollmentConfig::default();
        assert_eq!(config.adult_age, 18);
        assert_eq!(config.registration_expiry_days, 7);
        assert_eq!(config.code_retry_cap, 5);
        assert_eq!(config.default_price_3x_weekly, Decimal::new(80, 0));
    }

    #[test]
    fn test_deserialize_with_missing_sections() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                port = 8080

                [database]
                url = "postgres://localhost/academy"

                [enrollment]
                adult_age = 21
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .and_then(config::Config::try_deserialize)
            .unwrap_or_else(|e| panic!("config should parse: {e}"));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.enrollment.adult_age, 21);
        assert_eq!(config.enrollment.code_retry_cap, 5);
        assert!(config.scheduler.enabled);
    }
}
