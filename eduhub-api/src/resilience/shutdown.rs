//! One-time graceful teardown driven by termination signals.
//!
//! [`ShutdownCoordinator::shutdown`] may be called any number of times, from
//! any number of tasks; only the first call tears the registered components
//! down. [`SignalListener`] forwards every SIGTERM/SIGINT to it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info};

/// Trait for components that support graceful shutdown
#[async_trait]
pub trait GracefulShutdown: Send + Sync {
    /// Perform graceful shutdown
    async fn shutdown(&self) -> Result<(), ShutdownError>;

    /// Get the name of this component
    fn name(&self) -> &str;
}

/// Shutdown errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ShutdownError {
    /// Shutdown timed out
    #[error("Shutdown timed out after {0:?}")]
    Timeout(Duration),

    /// Component shutdown failed
    #[error("Component {component} shutdown failed: {reason}")]
    ComponentFailed { component: String, reason: String },
}

/// Coordinator for graceful shutdown
pub struct ShutdownCoordinator {
    timeout: Duration,
    components: RwLock<Vec<Arc<dyn GracefulShutdown>>>,
    is_shutting_down: AtomicBool,
    trigger: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    /// `timeout` bounds each component's teardown separately.
    pub fn new(timeout: Duration) -> Self {
        let (trigger, _) = watch::channel(false);
        Self {
            timeout,
            components: RwLock::new(Vec::new()),
            is_shutting_down: AtomicBool::new(false),
            trigger,
        }
    }

    /// Components are torn down in registration order.
    pub async fn register_component(&self, component: Arc<dyn GracefulShutdown>) {
        self.components.write().await.push(component);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has started. Suitable for
    /// `axum::serve(..).with_graceful_shutdown(..)`.
    pub async fn triggered(&self) {
        let mut rx = self.trigger.subscribe();
        // The sender lives as long as `self`, so this cannot fail while borrowed.
        let _ = rx.wait_for(|started| *started).await;
    }

    /// Tears every registered component down, once.
    ///
    /// Returns `true` for the call that performed the teardown and `false`
    /// for every later or concurrent call. Component failures are logged and
    /// never returned.
    pub async fn shutdown(&self) -> bool {
        if self
            .is_shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Shutdown already in progress");
            return false;
        }

        info!("Starting graceful shutdown");
        self.trigger.send_replace(true);

        self.shutdown_components().await;

        info!("Graceful shutdown completed");
        true
    }

    async fn shutdown_components(&self) {
        let components = self.components.read().await;
        info!("Shutting down {} components", components.len());

        for component in components.iter() {
            let name = component.name();
            debug!("Shutting down component: {}", name);

            let outcome = match timeout(self.timeout, component.shutdown()).await {
                Ok(result) => result,
                Err(_) => Err(ShutdownError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(()) => info!("Component {} shut down successfully", name),
                Err(e) => error!("Component {} shutdown failed: {}", name, e),
            }
        }
    }
}

/// Forwards termination signals to a [`ShutdownCoordinator`].
pub struct SignalListener {
    coordinator: Arc<ShutdownCoordinator>,
}

impl SignalListener {
    pub fn new(coordinator: Arc<ShutdownCoordinator>) -> Self {
        Self { coordinator }
    }

    /// Listens until the signal streams close. Every delivery calls
    /// [`ShutdownCoordinator::shutdown`]; repeats are absorbed there.
    #[cfg(unix)]
    pub async fn run(self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        let mut interrupt = signal(SignalKind::interrupt())?;

        loop {
            let name = tokio::select! {
                Some(()) = terminate.recv() => "SIGTERM",
                Some(()) = interrupt.recv() => "SIGINT",
                else => return Ok(()),
            };
            self.deliver(name);
        }
    }

    #[cfg(not(unix))]
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            tokio::signal::ctrl_c().await?;
            self.deliver("Ctrl+C");
        }
    }

    /// Teardown runs on its own task so that a second signal is observed
    /// while the first teardown is still in flight.
    fn deliver(&self, name: &'static str) -> JoinHandle<()> {
        info!("Received {}", name);
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            if !coordinator.shutdown().await {
                debug!("Ignoring {}: shutdown already performed", name);
            }
        })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!("Failed to install signal handlers: {}", e);
            }
        })
    }
}
