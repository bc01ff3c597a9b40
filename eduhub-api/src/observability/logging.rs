//! Structured logging setup.
//!
//! JSON output for production, pretty output for development. `RUST_LOG`
//! takes precedence over the configured level.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format for production (machine-readable)
    Json,
    /// Pretty format for development (human-readable)
    Pretty,
    /// Compact format for minimal output
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    /// Per-module directives appended to `level` (e.g. "reqwest=warn,tower_http=debug")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: "info".to_string(),
            filter: None,
        }
    }
}

impl LogConfig {
    fn env_filter(&self) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        match &self.filter {
            Some(directives) => EnvFilter::try_new(format!("{},{}", self.level, directives)),
            None => EnvFilter::try_new(&self.level),
        }
    }
}

/// Initialize the logging system with the given configuration
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = config.env_filter()?;

    match config.format {
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(json_layer).try_init()?;
        }
        LogFormat::Pretty => {
            let pretty_layer = fmt::layer()
                .pretty()
                .with_span_events(FmtSpan::CLOSE)
                .with_filter(env_filter);

            tracing_subscriber::registry().with(pretty_layer).try_init()?;
        }
        LogFormat::Compact => {
            let compact_layer = fmt::layer().compact().with_filter(env_filter);

            tracing_subscriber::registry().with(compact_layer).try_init()?;
        }
    }

    info!("Logging system initialized with format: {:?}", config.format);
    Ok(())
}
