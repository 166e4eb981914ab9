use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the site backend.
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
    pub leads: LeadsConfig,
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
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat(raw))?,
            Err(_) => LogFormat::Compact,
        };

        let close_reset_ms = env::var("LEADS_CLOSE_RESET_MS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidResetDelay)?;

        let leads = LeadsConfig {
            enquiry_table: env::var("LEADS_ENQUIRY_TABLE")
                .unwrap_or_else(|_| LeadsConfig::DEFAULT_ENQUIRY_TABLE.to_string()),
            property_enquiry_table: env::var("LEADS_PROPERTY_ENQUIRY_TABLE")
                .unwrap_or_else(|_| LeadsConfig::DEFAULT_PROPERTY_ENQUIRY_TABLE.to_string()),
            property_table: env::var("LEADS_PROPERTY_TABLE")
                .unwrap_or_else(|_| LeadsConfig::DEFAULT_PROPERTY_TABLE.to_string()),
            close_reset_delay: Duration::from_millis(close_reset_ms),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            leads,
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

/// Tracing output controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" | "" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Collections and timings used by the lead-capture wizards.
#[derive(Debug, Clone)]
pub struct LeadsConfig {
    pub enquiry_table: String,
    pub property_enquiry_table: String,
    pub property_table: String,
    /// How long a closed wizard lingers before its session is reset and dropped.
    pub close_reset_delay: Duration,
}

impl LeadsConfig {
    pub const DEFAULT_ENQUIRY_TABLE: &'static str = "enquiries";
    pub const DEFAULT_PROPERTY_ENQUIRY_TABLE: &'static str = "property_enquiries";
    pub const DEFAULT_PROPERTY_TABLE: &'static str = "properties";
}

impl Default for LeadsConfig {
    fn default() -> Self {
        Self {
            enquiry_table: Self::DEFAULT_ENQUIRY_TABLE.to_string(),
            property_enquiry_table: Self::DEFAULT_PROPERTY_ENQUIRY_TABLE.to_string(),
            property_table: Self::DEFAULT_PROPERTY_TABLE.to_string(),
            close_reset_delay: Duration::from_millis(300),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidResetDelay,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'pretty' (found '{value}')")
            }
            ConfigError::InvalidResetDelay => {
                write!(f, "LEADS_CLOSE_RESET_MS must be a whole number of milliseconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogFormat(_)
            | ConfigError::InvalidResetDelay => None,
        }
    }
}
