mod support;

use async_trait::async_trait;
use eduhub_api::resilience::{GracefulShutdown, ShutdownCoordinator, ShutdownError};
use eduhub_core::ConnectionState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::*;

struct Recorder {
    name: &'static str,
    behavior: Outcome,
    calls: AtomicUsize,
}

enum Outcome {
    Succeed,
    Fail,
    Hang,
}

impl Recorder {
    fn new(name: &'static str, behavior: Outcome) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GracefulShutdown for Recorder {
    async fn shutdown(&self) -> Result<(), ShutdownError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Outcome::Succeed => Ok(()),
            Outcome::Fail => Err(ShutdownError::ComponentFailed {
                component: self.name.to_string(),
                reason: "flush failed".to_string(),
            }),
            Outcome::Hang => futures::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[tokio::test]
async fn test_back_to_back_signals_tear_down_once() {
    let platform = FakePlatform::new();
    let manager = connected_manager(&platform, 3).await;
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
    coordinator.register_component(manager.clone()).await;

    let (first, second) = tokio::join!(coordinator.shutdown(), coordinator.shutdown());

    assert!(first ^ second);
    assert_eq!(platform.closes(), 1);
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    assert!(!coordinator.shutdown().await);
    assert_eq!(platform.closes(), 1);
}

#[tokio::test]
async fn test_component_failure_is_not_rethrown() {
    let failing = Recorder::new("cache", Outcome::Fail);
    let after = Recorder::new("audit", Outcome::Succeed);
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
    coordinator.register_component(failing.clone()).await;
    coordinator.register_component(after.clone()).await;

    assert!(coordinator.shutdown().await);
    assert_eq!(failing.calls(), 1);
    assert_eq!(after.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_component_is_abandoned_after_timeout() {
    let hung = Recorder::new("stuck", Outcome::Hang);
    let after = Recorder::new("audit", Outcome::Succeed);
    let coordinator = ShutdownCoordinator::new(Duration::from_secs(2));
    coordinator.register_component(hung.clone()).await;
    coordinator.register_component(after.clone()).await;

    let start = tokio::time::Instant::now();
    assert!(coordinator.shutdown().await);

    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(after.calls(), 1);
}

#[tokio::test]
async fn test_triggered_wakes_waiters() {
    let coordinator = Arc::new(ShutdownCoordinator::new(Duration::from_secs(1)));
    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.triggered().await })
        })
        .collect();

    assert!(!coordinator.is_shutting_down());
    coordinator.shutdown().await;

    for waiter in waiters {
        waiter.await.unwrap();
    }
}
