//! Health probing of the three platform sub-services.
//!
//! Each sub-service gets one minimal round trip. Probes run concurrently and
//! independently: a failing or hung probe never keeps the others from
//! reporting. Results fold into a [`HealthReport`].

use async_trait::async_trait;
use eduhub_core::{
    BlobStore, DocumentStore, HealthReport, IdentityService, PlatformError, PlatformResult,
    ProbeOutcome, ServiceKind,
};
use futures::future::join_all;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// One lightweight reachability check against one sub-service.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    fn service(&self) -> ServiceKind;

    async fn probe(&self) -> PlatformResult<()>;
}

/// Lists at most one collection id.
pub struct DocumentStoreProbe(Arc<dyn DocumentStore>);

impl DocumentStoreProbe {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self(store)
    }
}

#[async_trait]
impl ServiceProbe for DocumentStoreProbe {
    fn service(&self) -> ServiceKind {
        ServiceKind::DocumentStore
    }

    async fn probe(&self) -> PlatformResult<()> {
        self.0.list_collection_ids(1).await.map(|_| ())
    }
}

/// Lists at most one user.
pub struct IdentityProbe(Arc<dyn IdentityService>);

impl IdentityProbe {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self(identity)
    }
}

#[async_trait]
impl ServiceProbe for IdentityProbe {
    fn service(&self) -> ServiceKind {
        ServiceKind::Identity
    }

    async fn probe(&self) -> PlatformResult<()> {
        self.0.list_users(1).await.map(|_| ())
    }
}

/// Confirms the configured bucket exists. A missing bucket is a failure.
pub struct BlobStoreProbe(Arc<dyn BlobStore>);

impl BlobStoreProbe {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self(store)
    }
}

#[async_trait]
impl ServiceProbe for BlobStoreProbe {
    fn service(&self) -> ServiceKind {
        ServiceKind::BlobStore
    }

    async fn probe(&self) -> PlatformResult<()> {
        if self.0.bucket_exists().await? {
            Ok(())
        } else {
            Err(PlatformError::NotConfigured(format!(
                "bucket {} does not exist",
                self.0.bucket()
            )))
        }
    }
}

/// Stands in for a sub-service whose client could not be built.
pub struct UnavailableProbe {
    service: ServiceKind,
    error: PlatformError,
}

impl UnavailableProbe {
    pub fn new(service: ServiceKind, error: PlatformError) -> Self {
        Self { service, error }
    }
}

#[async_trait]
impl ServiceProbe for UnavailableProbe {
    fn service(&self) -> ServiceKind {
        self.service
    }

    async fn probe(&self) -> PlatformResult<()> {
        Err(self.error.clone())
    }
}

/// Runs a set of probes and aggregates their outcomes.
#[derive(Debug, Clone, Default)]
pub struct HealthProbe {
    timeout: Option<Duration>,
}

impl HealthProbe {
    /// Probes without a time limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// A probe that exceeds `timeout` counts as failed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn check(&self, probes: &[Arc<dyn ServiceProbe>]) -> HealthReport {
        let outcomes = join_all(probes.iter().map(|probe| self.run(probe.as_ref()))).await;
        let report = HealthReport::from_outcomes(outcomes);

        debug!(
            "Health check finished: {} ({:?})",
            report.status, report.services
        );
        report
    }

    async fn run(&self, probe: &dyn ServiceProbe) -> ProbeOutcome {
        let service = probe.service();
        let start = Instant::now();

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, probe.probe()).await {
                Ok(result) => result,
                Err(_) => Err(PlatformError::Timeout(limit)),
            },
            None => probe.probe().await,
        };

        match result {
            Ok(()) => {
                let latency = start.elapsed();
                histogram!("platform_probe_latency_ms", "service" => service.as_str())
                    .record(latency.as_secs_f64() * 1000.0);
                ProbeOutcome::succeeded(service, latency)
            }
            Err(e) => {
                warn!("{} probe failed: {}", service, e);
                counter!("platform_probe_failures_total", "service" => service.as_str())
                    .increment(1);
                ProbeOutcome::failed(service, e.to_string())
            }
        }
    }
}
