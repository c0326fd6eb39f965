use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::tracking::evaluations::{LinkagePolicy, ProgressLinkage};

const DEVELOPMENT_SESSION_SECRET: &str = "englesoft-development-session-secret";

/// Longest accepted session lifetime: 30 days.
pub const MAX_SESSION_TTL_MINUTES: i64 = 30 * 24 * 60;

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

    pub fn label(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }

    /// Raw infrastructure error text is only echoed back to clients outside production.
    pub fn exposes_error_details(self) -> bool {
        !matches!(self, Self::Production)
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub tracking: TrackingConfig,
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
        let public_dir = PathBuf::from(
            env::var("APP_PUBLIC_DIR").unwrap_or_else(|_| "public".to_string()),
        );

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(ConfigError::InvalidMaxConnections)?;

        let secret = match env::var("APP_SESSION_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingSessionSecret)
            }
            _ => DEVELOPMENT_SESSION_SECRET.to_string(),
        };
        let ttl_minutes = env::var("APP_SESSION_TTL_MINUTES")
            .unwrap_or_else(|_| "480".to_string())
            .parse::<i64>()
            .ok()
            .filter(|value| (1..=MAX_SESSION_TTL_MINUTES).contains(value))
            .filter(|value| chrono::TimeDelta::try_minutes(*value).is_some())
            .ok_or(ConfigError::InvalidSessionTtl)?;

        let linkage = LinkagePolicy {
            initial: linkage_from_env(
                "APP_INITIAL_PROGRESS_LINKAGE",
                ProgressLinkage::BestEffort,
            )?,
            final_: linkage_from_env("APP_FINAL_PROGRESS_LINKAGE", ProgressLinkage::Required)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                host,
                port,
                public_dir,
            },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            session: SessionConfig {
                secret,
                ttl_minutes,
            },
            tracking: TrackingConfig { linkage },
        })
    }
}

fn linkage_from_env(
    key: &'static str,
    default: ProgressLinkage,
) -> Result<ProgressLinkage, ConfigError> {
    match env::var(key) {
        Ok(raw) => ProgressLinkage::parse(&raw).ok_or(ConfigError::InvalidLinkage { key, raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_dir: PathBuf,
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

/// Postgres connection settings. `url` stays optional so the in-memory mode can boot.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.url.as_deref().ok_or(ConfigError::MissingDatabaseUrl)
    }
}

/// Signing material for login session tokens.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_minutes", &self.ttl_minutes)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub linkage: LinkagePolicy,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMaxConnections,
    MissingDatabaseUrl,
    MissingSessionSecret,
    InvalidSessionTtl,
    InvalidLinkage { key: &'static str, raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMaxConnections => {
                write!(f, "DATABASE_MAX_CONNECTIONS must be a positive integer")
            }
            ConfigError::MissingDatabaseUrl => {
                write!(f, "DATABASE_URL must be set unless serving in-memory")
            }
            ConfigError::MissingSessionSecret => {
                write!(f, "APP_SESSION_SECRET must be set in production")
            }
            ConfigError::InvalidSessionTtl => {
                write!(
                    f,
                    "APP_SESSION_TTL_MINUTES must be an integer between 1 and {MAX_SESSION_TTL_MINUTES}"
                )
            }
            ConfigError::InvalidLinkage { key, raw } => {
                write!(f, "{key} must be 'required' or 'best_effort' (got '{raw}')")
            }
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
