use std::time::Duration;
use thiserror::Error;

use crate::domain::{ConfigViolation, ServiceKind};

/// Failure of a single call against the managed platform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Platform returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Credential error: {0}")]
    Credentials(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("No platform connection has been established")]
    NotConnected,

    #[error("Platform connection is closed")]
    Closed,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[cfg(feature = "http")]
impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return PlatformError::Decode(err.to_string());
        }
        match err.status() {
            Some(status) => PlatformError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => PlatformError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        PlatformError::Decode(err.to_string())
    }
}

/// Errors surfaced by the connection lifecycle.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    #[error("Invalid platform configuration: {}", format_violations(.0))]
    Configuration(Vec<ConfigViolation>),

    #[error("Connection initialization failed after {attempts} attempts: {source}")]
    Initialization {
        attempts: u32,
        #[source]
        source: PlatformError,
    },

    #[error("Failed to construct {service} client: {source}")]
    ServiceConstruction {
        service: ServiceKind,
        #[source]
        source: PlatformError,
    },

    #[error("Reconnect budget exhausted ({attempts_used} attempts, max {max_attempts})")]
    ReconnectExhausted { max_attempts: u32, attempts_used: u32 },

    #[error("Connection initialization cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error("Connection initialization timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection has already been initialized")]
    AlreadyInitialized,

    #[error("Initial connection is still being established")]
    InitializationPending,

    #[error("Connection has been shut down")]
    ShutDown,
}

impl ConnectionError {
    /// Whether the process can keep serving after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConnectionError::Configuration(_)
                | ConnectionError::Initialization { .. }
                | ConnectionError::Cancelled { .. }
                | ConnectionError::Timeout(_)
        )
    }
}

fn format_violations(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.key, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
