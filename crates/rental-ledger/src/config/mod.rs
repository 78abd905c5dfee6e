use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::ledger::delinquency::DEFAULT_GRACE_DAYS;
use crate::ledger::schedule::DEFAULT_DUE_DAY;

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Service configuration assembled from `.env` and the process environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub ledger: LedgerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: AppEnvironment::from_label(&var_or("APP_ENV", "development")),
            server: ServerConfig::from_env()?,
            telemetry: TelemetryConfig {
                log_level: var_or("APP_LOG_LEVEL", "info"),
            },
            ledger: LedgerConfig::from_env()?,
        })
    }
}

/// Address the HTTP listener binds to.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = var_or("APP_PORT", "3000")
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        Ok(Self {
            host: var_or("APP_HOST", "127.0.0.1"),
            port,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::from([127, 0, 0, 1])
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost { source })?
        };

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Business policy knobs for schedule generation and delinquency.
///
/// `due_day` is the day of month rent falls due (clamped to the last day of short months) and
/// `grace_days` is how many days past due an unpaid period may sit before the contract counts
/// as delinquent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    pub due_day: u32,
    pub grace_days: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            due_day: DEFAULT_DUE_DAY,
            grace_days: DEFAULT_GRACE_DAYS,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let due_day = match env::var("LEDGER_DUE_DAY") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|day| (1..=31).contains(day))
                .ok_or(ConfigError::InvalidDueDay { value: raw })?,
            Err(_) => defaults.due_day,
        };

        let grace_days = match env::var("LEDGER_GRACE_DAYS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| (0..=365).contains(days))
                .ok_or(ConfigError::InvalidGraceDays { value: raw })?,
            Err(_) => defaults.grace_days,
        };

        Ok(Self {
            due_day,
            grace_days,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDueDay { value: String },
    InvalidGraceDays { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDueDay { value } => {
                write!(f, "LEDGER_DUE_DAY must be a day of month (1-31), got '{value}'")
            }
            ConfigError::InvalidGraceDays { value } => {
                write!(f, "LEDGER_GRACE_DAYS must be between 0 and 365, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidDueDay { .. }
            | ConfigError::InvalidGraceDays { .. } => None,
        }
    }
}
