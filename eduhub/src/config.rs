use anyhow::Result;
use config::{Config as ConfigLoader, Environment, File};
use eduhub_api::observability::{LogConfig, LogFormat};
use eduhub_api::ConnectionConfig;
use eduhub_storage::PlatformEndpoints;
use serde::Deserialize;
use std::time::Duration;

/// Server settings. Platform credentials are not part of this; they come
/// from the unprefixed process environment.
///
/// A timeout of zero disables that timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub log_filter: Option<String>,
    pub connect_max_attempts: u32,
    pub connect_retry_delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub probe_timeout_ms: u64,
    pub shutdown_timeout_secs: u64,
    pub document_store_endpoint: Option<String>,
    pub identity_endpoint: Option<String>,
    pub blob_store_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub metadata_token_endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("EDUHUB").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            max_attempts: self.connect_max_attempts,
            retry_delay: Duration::from_millis(self.connect_retry_delay_ms),
            init_timeout: non_zero(Duration::from_secs(self.connect_timeout_secs)),
            probe_timeout: non_zero(Duration::from_millis(self.probe_timeout_ms)),
        }
    }

    pub fn logging(&self) -> LogConfig {
        LogConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            filter: self.log_filter.clone(),
        }
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn endpoints(&self) -> PlatformEndpoints {
        let mut endpoints = PlatformEndpoints::default();
        let overrides = [
            (&mut endpoints.document_store, &self.document_store_endpoint),
            (&mut endpoints.identity, &self.identity_endpoint),
            (&mut endpoints.blob_store, &self.blob_store_endpoint),
            (&mut endpoints.token, &self.token_endpoint),
            (&mut endpoints.metadata_token, &self.metadata_token_endpoint),
        ];
        for (target, value) in overrides {
            if let Some(url) = value {
                *target = url.clone();
            }
        }
        endpoints
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            log_filter: None,
            connect_max_attempts: 3,
            connect_retry_delay_ms: 5000,
            connect_timeout_secs: 60,
            probe_timeout_ms: 5000,
            shutdown_timeout_secs: 10,
            document_store_endpoint: None,
            identity_endpoint: None,
            blob_store_endpoint: None,
            token_endpoint: None,
            metadata_token_endpoint: None,
        }
    }
}
