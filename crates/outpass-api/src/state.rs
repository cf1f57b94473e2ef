//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! AppState holds the two services and nothing else mutable: all request
//! and ledger data lives behind their store traits, so the same handlers
//! run over the in-memory backends (development, tests) and PostgreSQL.

use std::str::FromStr;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use thiserror::Error;

use outpass_core::{Clock, SystemClock};
use outpass_service::{CheckpointVerifier, OutpassLifecycle};
use outpass_state::DirectionPolicy;
use outpass_store::{
    LogLedger, MemoryLogLedger, MemoryRequestStore, PgLogLedger, PgRequestStore, RequestStore,
};

// -- Configuration ------------------------------------------------------------

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid {
                var: "LOG_FORMAT",
                value: other.to_string(),
            }),
        }
    }
}

/// A configuration variable held an unusable value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Application configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. `None` disables the secret check.
    pub auth_token: Option<String>,
    /// Checkpoint direction sequencing rule.
    pub direction_policy: DirectionPolicy,
    /// Log output format.
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("direction_policy", &self.direction_policy)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: Self::DEFAULT_PORT,
            auth_token: None,
            direction_policy: DirectionPolicy::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    const DEFAULT_PORT: u16 = 8080;

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps variable names to
    /// values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "PORT",
                value: raw,
            })?,
            None => Self::DEFAULT_PORT,
        };
        let auth_token = lookup("AUTH_TOKEN").filter(|t| !t.is_empty());
        let direction_policy = match lookup("OUTPASS_DIRECTION_POLICY") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "OUTPASS_DIRECTION_POLICY",
                value: raw,
            })?,
            None => DirectionPolicy::default(),
        };
        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };
        Ok(Self {
            port,
            auth_token,
            direction_policy,
            log_format,
        })
    }
}

// -- AppState -----------------------------------------------------------------

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: OutpassLifecycle,
    pub verifier: CheckpointVerifier,
    pub config: AppConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("lifecycle", &self.lifecycle)
            .field("verifier", &self.verifier)
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// In-memory state with default configuration and the system clock.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// State over PostgreSQL when a pool is given, in-memory otherwise.
    pub fn with_config(config: AppConfig, pool: Option<PgPool>) -> Self {
        let (requests, ledger): (Arc<dyn RequestStore>, Arc<dyn LogLedger>) = match pool {
            Some(pool) => (
                Arc::new(PgRequestStore::new(pool.clone())),
                Arc::new(PgLogLedger::new(pool)),
            ),
            None => (
                Arc::new(MemoryRequestStore::new()),
                Arc::new(MemoryLogLedger::new()),
            ),
        };
        Self::with_parts(config, requests, ledger, Arc::new(SystemClock))
    }

    /// State over explicit stores and clock.
    pub fn with_parts(
        config: AppConfig,
        requests: Arc<dyn RequestStore>,
        ledger: Arc<dyn LogLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lifecycle = OutpassLifecycle::new(Arc::clone(&requests), Arc::clone(&clock));
        let verifier =
            CheckpointVerifier::new(requests, ledger, clock).with_policy(config.direction_policy);
        Self {
            lifecycle,
            verifier,
            config,
            metrics: None,
        }
    }

    /// Attach a Prometheus render handle for `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
