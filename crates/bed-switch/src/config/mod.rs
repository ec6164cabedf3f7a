use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::switching::rate_limit::{RateLimiter, WindowPolicy, DEFAULT_WINDOW_DAYS};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub switching: SwitchPolicyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            switching: SwitchPolicyConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Rate-limit window applied to new switch requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchPolicyConfig {
    pub window_days: u32,
    pub policy: WindowPolicy,
}

impl Default for SwitchPolicyConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            policy: WindowPolicy::default(),
        }
    }
}

impl SwitchPolicyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let window_days = match env::var("APP_SWITCH_WINDOW_DAYS") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(days) if days > 0 => days,
                _ => return Err(ConfigError::InvalidWindowDays { value: raw }),
            },
            Err(_) => DEFAULT_WINDOW_DAYS,
        };

        let policy = match env::var("APP_SWITCH_WINDOW_POLICY") {
            Ok(raw) => raw
                .parse::<WindowPolicy>()
                .map_err(|_| ConfigError::InvalidWindowPolicy { value: raw })?,
            Err(_) => WindowPolicy::default(),
        };

        Ok(Self {
            window_days,
            policy,
        })
    }

    pub fn limiter(&self) -> RateLimiter {
        RateLimiter::new(self.window_days, self.policy)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidWindowDays { value: String },
    InvalidWindowPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidWindowDays { value } => write!(
                f,
                "APP_SWITCH_WINDOW_DAYS must be a positive number of days, got '{}'",
                value
            ),
            ConfigError::InvalidWindowPolicy { value } => write!(
                f,
                "APP_SWITCH_WINDOW_POLICY must be 'rolling' or 'until_resolved', got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
