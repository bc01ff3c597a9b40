use async_trait::async_trait;
use eduhub_core::{
    BlobStore, ConnectionError, ConnectionState, DocumentStore, HealthReport, IdentityService,
    PlatformConnection, PlatformConnector, PlatformError, PlatformResult, RetryBudget,
    ServiceKind,
};
use metrics::counter;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handles::ServiceHandleFactory;
use crate::observability::health::{
    BlobStoreProbe, DocumentStoreProbe, HealthProbe, IdentityProbe, ServiceProbe,
    UnavailableProbe,
};
use crate::resilience::retry::{retry, ConstantBackoff, RetryError};
use crate::resilience::shutdown::{GracefulShutdown, ShutdownError};

/// Tunables for establishing and supervising the platform connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Attempts for the first connection, and the reconnect budget.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// Bound on the whole first-connection loop and on each reconnect `connect()`.
    pub init_timeout: Option<Duration>,
    /// Bound on each individual health probe.
    pub probe_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(5000),
            init_timeout: Some(Duration::from_secs(60)),
            probe_timeout: Some(Duration::from_secs(5)),
        }
    }
}

struct ReconnectLedger {
    budget: RetryBudget,
    generation: u64,
    last_result: Option<Result<bool, ConnectionError>>,
}

/// Owns the process's connection to the managed platform.
///
/// Constructed once at startup and shared as `Arc<ConnectionManager>`.
/// Callers borrow sub-service handles through the accessors and must not
/// hold them across [`ConnectionManager::reconnect`].
pub struct ConnectionManager {
    connector: Arc<dyn PlatformConnector>,
    config: ConnectionConfig,
    handles: ServiceHandleFactory,
    probe: HealthProbe,
    state: watch::Sender<ConnectionState>,
    ledger: Mutex<ReconnectLedger>,
    generation: AtomicU64,
    initialized: AtomicBool,
    /// Set while the first `initialize` has not yet settled.
    establishing: AtomicBool,
    shut_down: AtomicBool,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn PlatformConnector>, config: ConnectionConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Initializing);
        let probe = match config.probe_timeout {
            Some(limit) => HealthProbe::with_timeout(limit),
            None => HealthProbe::new(),
        };
        let budget = RetryBudget::new(config.max_attempts);

        Self {
            connector,
            config,
            handles: ServiceHandleFactory::new(),
            probe,
            state,
            ledger: Mutex::new(ReconnectLedger {
                budget,
                generation: 0,
                last_result: None,
            }),
            generation: AtomicU64::new(0),
            initialized: AtomicBool::new(false),
            establishing: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watches state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Snapshot of the reconnect budget. Waits for an in-flight reconnect.
    pub async fn retry_budget(&self) -> RetryBudget {
        self.ledger.lock().await.budget.clone()
    }

    pub async fn has_handle(&self, service: ServiceKind) -> bool {
        self.handles.is_memoized(service).await
    }

    /// Establishes the first top-level connection, retrying with a fixed delay.
    ///
    /// Fails with `Initialization` once every attempt has failed, `Cancelled`
    /// when `cancel` fires first, and `Timeout` when the whole loop outlives
    /// `init_timeout`. The state ends as `Connected` or `Error`.
    pub async fn initialize(&self, cancel: &CancellationToken) -> Result<(), ConnectionError> {
        if self.is_shut_down() {
            return Err(ConnectionError::ShutDown);
        }
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(ConnectionError::AlreadyInitialized);
        }
        self.establishing.store(true, Ordering::SeqCst);

        self.transition(ConnectionState::Initializing);
        info!(
            "Establishing platform connection (max attempts: {}, delay: {:?})",
            self.config.max_attempts, self.config.retry_delay
        );

        let outcome = self.establish(cancel).await;

        // Serializes with teardown so a connection is never installed after it.
        let _ledger = self.ledger.lock().await;
        self.establishing.store(false, Ordering::SeqCst);
        match outcome {
            Ok(connection) if self.is_shut_down() => {
                if let Err(e) = connection.close().await {
                    warn!("Failed to close connection opened during shutdown: {}", e);
                }
                Err(ConnectionError::ShutDown)
            }
            Ok(connection) => {
                self.install(connection).await;
                self.transition(ConnectionState::Connected);
                info!("Platform connection established");
                Ok(())
            }
            Err(e) => {
                error!("Platform connection failed: {}", e);
                self.transition(ConnectionState::Error);
                Err(e)
            }
        }
    }

    async fn establish(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Arc<dyn PlatformConnection>, ConnectionError> {
        let policy = ConstantBackoff::new(self.config.max_attempts as usize, self.config.retry_delay);
        let attempt = retry(&policy, cancel, || self.connector.connect());

        let result = match self.config.init_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .map_err(|_| ConnectionError::Timeout(limit))?,
            None => attempt.await,
        };

        result.map_err(|e| match e {
            RetryError::Exhausted { error, attempts } => ConnectionError::Initialization {
                attempts: attempts as u32,
                source: error,
            },
            RetryError::Cancelled { attempts, .. } => ConnectionError::Cancelled {
                attempts: attempts as u32,
            },
        })
    }

    pub async fn document_store(&self) -> Result<Arc<dyn DocumentStore>, ConnectionError> {
        self.handles
            .document_store()
            .await
            .map_err(|source| ConnectionError::ServiceConstruction {
                service: ServiceKind::DocumentStore,
                source,
            })
    }

    pub async fn identity(&self) -> Result<Arc<dyn IdentityService>, ConnectionError> {
        self.handles
            .identity()
            .await
            .map_err(|source| ConnectionError::ServiceConstruction {
                service: ServiceKind::Identity,
                source,
            })
    }

    pub async fn blob_store(&self) -> Result<Arc<dyn BlobStore>, ConnectionError> {
        self.handles
            .blob_store()
            .await
            .map_err(|source| ConnectionError::ServiceConstruction {
                service: ServiceKind::BlobStore,
                source,
            })
    }

    /// Probes all three sub-services.
    ///
    /// While `Connected` or `Error` the verdict also becomes the new state;
    /// during a reconnect or after teardown the state is left alone.
    pub async fn check_health(&self) -> HealthReport {
        let report = self.probe_all().await;
        self.transition_if(report.status, |current| {
            matches!(current, ConnectionState::Connected | ConnectionState::Error)
        });
        report
    }

    async fn probe_all(&self) -> HealthReport {
        let document_store: Arc<dyn ServiceProbe> = match self.handles.document_store().await {
            Ok(store) => Arc::new(DocumentStoreProbe::new(store)),
            Err(e) => Arc::new(UnavailableProbe::new(ServiceKind::DocumentStore, e)),
        };
        let identity: Arc<dyn ServiceProbe> = match self.handles.identity().await {
            Ok(identity) => Arc::new(IdentityProbe::new(identity)),
            Err(e) => Arc::new(UnavailableProbe::new(ServiceKind::Identity, e)),
        };
        let blob_store: Arc<dyn ServiceProbe> = match self.handles.blob_store().await {
            Ok(store) => Arc::new(BlobStoreProbe::new(store)),
            Err(e) => Arc::new(UnavailableProbe::new(ServiceKind::BlobStore, e)),
        };

        self.probe.check(&[document_store, identity, blob_store]).await
    }

    /// Re-checks the connection, spending one unit of the reconnect budget.
    ///
    /// Returns `Ok(true)` without spending budget while `Connected`. Once the
    /// budget is spent every call fails with `ReconnectExhausted` and does no
    /// work. While the first `initialize` is still running the call is
    /// refused with `InitializationPending`. Concurrent callers are
    /// serialized; a caller that waited on another caller's reconnect
    /// receives that result instead of starting its own.
    pub async fn reconnect(&self) -> Result<bool, ConnectionError> {
        if self.is_shut_down() {
            return Err(ConnectionError::ShutDown);
        }
        if self.state() == ConnectionState::Connected {
            return Ok(true);
        }

        let observed = self.generation.load(Ordering::SeqCst);
        let mut ledger = self.ledger.lock().await;

        if self.is_shut_down() {
            return Err(ConnectionError::ShutDown);
        }
        if self.establishing.load(Ordering::SeqCst) {
            debug!("Reconnect refused while the first connection is being established");
            return Err(ConnectionError::InitializationPending);
        }
        if ledger.generation != observed {
            if let Some(result) = ledger.last_result.clone() {
                debug!("Reconnect already completed by a concurrent caller");
                return result;
            }
        }

        let result = self.reconnect_locked(&mut ledger.budget).await;

        ledger.generation += 1;
        ledger.last_result = Some(result.clone());
        self.generation.store(ledger.generation, Ordering::SeqCst);
        result
    }

    async fn reconnect_locked(&self, budget: &mut RetryBudget) -> Result<bool, ConnectionError> {
        if !budget.consume() {
            warn!(
                "Reconnect refused: budget of {} attempts is exhausted",
                budget.max_attempts
            );
            return Err(ConnectionError::ReconnectExhausted {
                max_attempts: budget.max_attempts,
                attempts_used: budget.attempts_used(),
            });
        }

        counter!("platform_reconnect_attempts_total").increment(1);
        info!(
            "Reconnecting to platform (attempt {}/{})",
            budget.attempts_used(),
            budget.max_attempts
        );

        self.handles.clear().await;
        self.transition(ConnectionState::Initializing);

        if !self.handles.has_connection().await {
            match self.connect_once().await {
                Ok(connection) => self.install(connection).await,
                Err(e) => warn!("Reconnect could not open a platform connection: {}", e),
            }
        }

        let report = self.probe_all().await;
        self.transition(report.status);
        Ok(report.is_healthy())
    }

    /// Installs `connection`, closing any connection it replaces.
    async fn install(&self, connection: Arc<dyn PlatformConnection>) {
        if let Some(previous) = self.handles.install(connection).await {
            info!("Closing replaced platform connection");
            if let Err(e) = previous.close().await {
                warn!("Failed to close replaced platform connection: {}", e);
            }
        }
    }

    async fn connect_once(&self) -> PlatformResult<Arc<dyn PlatformConnection>> {
        match self.config.init_timeout {
            Some(limit) => tokio::time::timeout(limit, self.connector.connect())
                .await
                .unwrap_or_else(|_| Err(PlatformError::Timeout(limit))),
            None => self.connector.connect().await,
        }
    }

    /// Closes the top-level connection and leaves the manager `Disconnected`.
    ///
    /// Safe to call more than once; later calls have nothing to close.
    pub async fn teardown(&self) -> PlatformResult<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        let _ledger = self.ledger.lock().await;

        let connection = self.handles.take().await;
        self.transition(ConnectionState::Disconnected);

        match connection {
            Some(connection) => {
                info!("Closing platform connection");
                connection.close().await
            }
            None => {
                debug!("No platform connection to close");
                Ok(())
            }
        }
    }

    fn transition(&self, next: ConnectionState) {
        self.transition_if(next, |_| true);
    }

    /// After teardown the only reachable state is `Disconnected`.
    fn transition_if(&self, next: ConnectionState, allowed: impl FnOnce(ConnectionState) -> bool) {
        let shut_down = self.is_shut_down();
        let mut previous = next;

        let changed = self.state.send_if_modified(|current| {
            if *current == next
                || (shut_down && next != ConnectionState::Disconnected)
                || !allowed(*current)
            {
                return false;
            }
            previous = std::mem::replace(current, next);
            true
        });

        if changed {
            info!("Connection state {} -> {}", previous, next);
            counter!("platform_state_transitions_total", "state" => next.as_str()).increment(1);
        }
    }
}

#[async_trait]
impl GracefulShutdown for ConnectionManager {
    async fn shutdown(&self) -> Result<(), ShutdownError> {
        self.teardown()
            .await
            .map_err(|e| ShutdownError::ComponentFailed {
                component: self.name().to_string(),
                reason: e.to_string(),
            })
    }

    fn name(&self) -> &str {
        "platform-connection"
    }
}
