//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default upstream API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Upstream assistant service configuration
    pub upstream: UpstreamConfig,
    /// Tenant registry configuration
    pub registry: RegistryConfig,
    /// Run polling configuration
    pub polling: PollingConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Upstream assistant service configuration
#[derive(Clone)]
pub struct UpstreamConfig {
    /// API key; `None` means chat requests fail with a configuration error
    pub api_key: Option<String>,
    /// Base URL of the assistant API
    pub base_url: String,
    /// Assistant used for tenants whose registry record has none
    pub default_assistant_id: Option<String>,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

// The API key never ends up in logs.
impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("default_assistant_id", &self.default_assistant_id)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Tenant registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Path to the registry JSON document
    pub path: PathBuf,
    /// Slug used when a request names no municipality
    pub default_slug: String,
}

/// Run polling configuration
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Fixed sleep between two status checks (in milliseconds)
    pub interval_ms: u64,
    /// Maximum number of status checks per run
    pub max_attempts: u32,
    /// Optional wall-clock budget for the whole poll loop (in milliseconds)
    pub deadline_ms: Option<u64>,
}

impl PollingConfig {
    /// Poll interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Wall-clock deadline as a `Duration`, if configured
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 700,
            max_attempts: 25,
            deadline_ms: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let polling_defaults = PollingConfig::default();
        Self {
            server: ServerConfig {
                port: parse_var("PORT").unwrap_or(8080),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            upstream: UpstreamConfig {
                api_key: non_empty_var("OPENAI_API_KEY"),
                base_url: non_empty_var("OPENAI_API_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
                default_assistant_id: non_empty_var("ASSISTANT_ID"),
                request_timeout_secs: parse_var("UPSTREAM_TIMEOUT_SECS").unwrap_or(30),
            },
            registry: RegistryConfig {
                path: non_empty_var("REGISTRY_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("registry").join("municipalities.json")),
                default_slug: non_empty_var("DEFAULT_SLUG")
                    .map(|s| s.trim().to_lowercase())
                    .unwrap_or_else(|| "radim".to_string()),
            },
            polling: PollingConfig {
                interval_ms: parse_var("RUN_POLL_INTERVAL_MS")
                    .unwrap_or(polling_defaults.interval_ms),
                max_attempts: parse_var("RUN_POLL_MAX_ATTEMPTS")
                    .filter(|n| *n > 0)
                    .unwrap_or(polling_defaults.max_attempts),
                deadline_ms: parse_var("RUN_POLL_DEADLINE_MS").filter(|ms| *ms > 0),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
