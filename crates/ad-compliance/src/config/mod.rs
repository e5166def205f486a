use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::submission::AllowList;

const DEFAULT_ENGINE_URL: &str = "http://localhost:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

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
    pub engine: EngineConfig,
    pub access: AccessConfig,
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
            engine: EngineConfig::from_env()?,
            access: AccessConfig::from_env(),
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

/// Where the analysis engines live and how the transport should treat them.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub base_url: Url,
    pub endpoints: EndpointPaths,
    pub request_timeout: Duration,
}

impl EngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_base =
            env::var("ADCHECK_ENGINE_URL").unwrap_or_else(|_| DEFAULT_ENGINE_URL.to_string());
        let base_url = parse_base_url(&raw_base)?;

        let defaults = EndpointPaths::default();
        let endpoints = EndpointPaths {
            analyze_ad: env::var("ADCHECK_ENDPOINT_ANALYZE_AD").unwrap_or(defaults.analyze_ad),
            analyze_with_gpt: env::var("ADCHECK_ENDPOINT_GPT").unwrap_or(defaults.analyze_with_gpt),
            analyze_with_gemini: env::var("ADCHECK_ENDPOINT_GEMINI")
                .unwrap_or(defaults.analyze_with_gemini),
            unified: env::var("ADCHECK_ENDPOINT_UNIFIED").unwrap_or(defaults.unified),
            rewrite: env::var("ADCHECK_ENDPOINT_REWRITE").unwrap_or(defaults.rewrite),
        };

        let request_timeout = match env::var("ADCHECK_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidTimeout { value: raw.clone() })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidTimeout { value: raw });
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url,
            endpoints,
            request_timeout,
        })
    }

    /// Configuration pointing every endpoint at `base_url` with default paths.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            endpoints: EndpointPaths::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}

/// Relative paths for each logical endpoint, joined onto the engine base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPaths {
    pub analyze_ad: String,
    pub analyze_with_gpt: String,
    pub analyze_with_gemini: String,
    pub unified: String,
    pub rewrite: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            analyze_ad: "analyze_ad".to_string(),
            analyze_with_gpt: "analyze_with_gpt".to_string(),
            analyze_with_gemini: "analyze_with_gemini".to_string(),
            unified: "analyze".to_string(),
            rewrite: "rewrite_ad_with_gpt".to_string(),
        }
    }
}

/// Operators permitted to submit ads.
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    pub allowed_emails: Vec<String>,
}

impl AccessConfig {
    fn from_env() -> Self {
        let allowed_emails = env::var("ADCHECK_ALLOWED_EMAILS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self { allowed_emails }
    }

    pub fn allow_list(&self) -> AllowList {
        self.allowed_emails.iter().collect()
    }
}

// Url::join drops the last path segment unless the base ends with '/'.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&normalized).map_err(|source| ConfigError::InvalidEngineUrl {
        value: raw.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme {
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidEngineUrl {
        value: String,
        source: url::ParseError,
    },
    UnsupportedScheme {
        value: String,
    },
    InvalidTimeout {
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidEngineUrl { value, .. } => {
                write!(f, "ADCHECK_ENGINE_URL '{value}' is not a valid URL")
            }
            ConfigError::UnsupportedScheme { value } => {
                write!(f, "ADCHECK_ENGINE_URL '{value}' must use http or https")
            }
            ConfigError::InvalidTimeout { value } => write!(
                f,
                "ADCHECK_REQUEST_TIMEOUT_SECS '{value}' must be a positive number of seconds"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidEngineUrl { source, .. } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::UnsupportedScheme { .. }
            | ConfigError::InvalidTimeout { .. } => None,
        }
    }
}
