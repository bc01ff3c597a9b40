use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::state::{ConnectionState, ServiceKind};

/// Per-service reachability flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFlags {
    pub document_store: bool,
    pub identity: bool,
    pub blob_store: bool,
}

impl ServiceFlags {
    pub fn get(&self, service: ServiceKind) -> bool {
        match service {
            ServiceKind::DocumentStore => self.document_store,
            ServiceKind::Identity => self.identity,
            ServiceKind::BlobStore => self.blob_store,
        }
    }

    pub fn set(&mut self, service: ServiceKind, up: bool) {
        match service {
            ServiceKind::DocumentStore => self.document_store = up,
            ServiceKind::Identity => self.identity = up,
            ServiceKind::BlobStore => self.blob_store = up,
        }
    }

    pub fn all(&self) -> bool {
        self.document_store && self.identity && self.blob_store
    }
}

/// Result of one probe against one sub-service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub service: ServiceKind,
    pub result: Result<Duration, String>,
}

impl ProbeOutcome {
    pub fn succeeded(service: ServiceKind, latency: Duration) -> Self {
        Self {
            service,
            result: Ok(latency),
        }
    }

    pub fn failed(service: ServiceKind, reason: impl Into<String>) -> Self {
        Self {
            service,
            result: Err(reason.into()),
        }
    }
}

/// Aggregated health of the three sub-services.
///
/// `latency_ms` only holds entries for probes that actually returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: ConnectionState,
    pub services: ServiceFlags,
    pub latency_ms: BTreeMap<ServiceKind, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<ServiceKind, String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Folds probe outcomes into a report. A service with no outcome counts as down.
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = ProbeOutcome>) -> Self {
        let mut services = ServiceFlags::default();
        let mut latency_ms = BTreeMap::new();
        let mut errors = BTreeMap::new();

        for outcome in outcomes {
            match outcome.result {
                Ok(latency) => {
                    services.set(outcome.service, true);
                    latency_ms.insert(outcome.service, latency.as_millis() as u64);
                }
                Err(reason) => {
                    services.set(outcome.service, false);
                    errors.insert(outcome.service, reason);
                }
            }
        }

        let status = if services.all() {
            ConnectionState::Connected
        } else {
            ConnectionState::Error
        };

        Self {
            status,
            services,
            latency_ms,
            errors,
            checked_at: Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status.is_connected()
    }
}
