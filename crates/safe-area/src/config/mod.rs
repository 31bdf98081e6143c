use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::geo::Coordinate;

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
    pub risk: RiskServiceConfig,
    pub facilities: FacilityConfig,
    pub dispatch: DispatchConfig,
    pub location: LocationConfig,
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

        let risk = RiskServiceConfig {
            base_url: string_var("RISK_SERVICE_URL", "http://localhost:8000"),
            timeout: Duration::from_millis(number_var("RISK_SERVICE_TIMEOUT_MS", 3_000)?),
            send_hour: flag_var("RISK_SERVICE_SEND_HOUR", true)?,
        };

        let facilities = FacilityConfig {
            source_url: string_var("POI_SOURCE_URL", "https://overpass-api.de/api/interpreter"),
            timeout: Duration::from_secs(number_var("POI_TIMEOUT_SECS", 15)?),
            result_limit: number_var("POI_RESULT_LIMIT", 20)?,
            radius_meters: number_var("FACILITY_RADIUS_METERS", 1_000)?,
            max_radius_meters: number_var("FACILITY_MAX_RADIUS_METERS", 5_000)?,
            limit_per_kind: number_var("FACILITY_LIMIT_PER_KIND", 5)?,
        };

        let dispatch = DispatchConfig {
            url: string_var("DISPATCH_URL", "http://localhost:8000/emergency"),
            timeout: Duration::from_secs(number_var("DISPATCH_TIMEOUT_SECS", 10)?),
        };

        let default_latitude = number_var("DEFAULT_LATITUDE", 37.7749)?;
        let default_longitude = number_var("DEFAULT_LONGITUDE", -122.4194)?;
        let location = LocationConfig {
            cache_path: PathBuf::from(string_var(
                "LOCATION_CACHE_PATH",
                ".safe-area/last_location.json",
            )),
            default_coordinate: Coordinate::new(default_latitude, default_longitude)
                .map_err(|_| ConfigError::InvalidDefaultCoordinate)?,
            fix_timeout: Duration::from_secs(5),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            risk,
            facilities,
            dispatch,
            location,
        })
    }
}

fn string_var(key: &'static str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn number_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
        _ => Ok(default),
    }
}

fn flag_var(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(default),
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key, value: raw }),
        },
        Err(_) => Ok(default),
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Remote scoring endpoint.
#[derive(Debug, Clone)]
pub struct RiskServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub send_hour: bool,
}

/// Point-of-interest source and ranking limits.
#[derive(Debug, Clone)]
pub struct FacilityConfig {
    pub source_url: String,
    pub timeout: Duration,
    pub result_limit: u32,
    pub radius_meters: u32,
    pub max_radius_meters: u32,
    pub limit_per_kind: usize,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub url: String,
    pub timeout: Duration,
}

/// Last-known-location cache and the seed used when no fix exists.
#[derive(Debug, Clone)]
pub struct LocationConfig {
    pub cache_path: PathBuf,
    pub default_coordinate: Coordinate,
    pub fix_timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
    InvalidFlag { key: &'static str, value: String },
    InvalidDefaultCoordinate,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be numeric (got '{value}')")
            }
            ConfigError::InvalidFlag { key, value } => {
                write!(f, "{key} must be true or false (got '{value}')")
            }
            ConfigError::InvalidDefaultCoordinate => write!(
                f,
                "DEFAULT_LATITUDE/DEFAULT_LONGITUDE must form a valid coordinate"
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
