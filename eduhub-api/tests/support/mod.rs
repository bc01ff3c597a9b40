#![allow(dead_code)]

use async_trait::async_trait;
use eduhub_api::{ConnectionConfig, ConnectionManager};
use eduhub_core::{
    BlobStore, DocumentStore, IdentityService, ObjectMetadata, PlatformConnection,
    PlatformConnector, PlatformError, PlatformResult, UserRecord,
};
use mockall::mock;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const TEST_BUCKET: &str = "eduhub-test.appspot.com";

mock! {
    pub Connector {}

    #[async_trait]
    impl PlatformConnector for Connector {
        async fn connect(&self) -> PlatformResult<Arc<dyn PlatformConnection>>;
    }
}

/// Scripted behaviour of one fake sub-service.
#[derive(Debug, Default)]
pub struct ServiceBehavior {
    delay_ms: AtomicU64,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl ServiceBehavior {
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Round trips served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> PlatformResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            Err(PlatformError::Transport("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

struct FakeDocumentStore(Arc<ServiceBehavior>);

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn list_collection_ids(&self, _page_size: u32) -> PlatformResult<Vec<String>> {
        self.0.respond().await?;
        Ok(vec!["courses".to_string()])
    }

    async fn get_document(&self, _path: &str) -> PlatformResult<Option<Value>> {
        self.0.respond().await?;
        Ok(None)
    }
}

struct FakeIdentity(Arc<ServiceBehavior>);

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn list_users(&self, _max_results: u32) -> PlatformResult<Vec<UserRecord>> {
        self.0.respond().await?;
        Ok(Vec::new())
    }

    async fn get_user(&self, _uid: &str) -> PlatformResult<Option<UserRecord>> {
        self.0.respond().await?;
        Ok(None)
    }
}

struct FakeBlobStore(Arc<ServiceBehavior>);

#[async_trait]
impl BlobStore for FakeBlobStore {
    fn bucket(&self) -> &str {
        TEST_BUCKET
    }

    async fn bucket_exists(&self) -> PlatformResult<bool> {
        self.0.respond().await?;
        Ok(true)
    }

    async fn object_metadata(&self, _name: &str) -> PlatformResult<Option<ObjectMetadata>> {
        self.0.respond().await?;
        Ok(None)
    }
}

/// In-memory stand-in for the managed platform.
#[derive(Debug, Default)]
pub struct FakePlatform {
    pub document_store: Arc<ServiceBehavior>,
    pub identity: Arc<ServiceBehavior>,
    pub blob_store: Arc<ServiceBehavior>,
    pub blob_store_misconfigured: AtomicBool,
    document_store_builds: AtomicUsize,
    closes: AtomicUsize,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_all_failing(&self, failing: bool) {
        self.document_store.set_failing(failing);
        self.identity.set_failing(failing);
        self.blob_store.set_failing(failing);
    }

    pub fn set_all_delays(&self, delay: Duration) {
        self.document_store.set_delay(delay);
        self.identity.set_delay(delay);
        self.blob_store.set_delay(delay);
    }

    pub fn document_store_builds(&self) -> usize {
        self.document_store_builds.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> usize {
        self.document_store.calls() + self.identity.calls() + self.blob_store.calls()
    }

    pub fn connection(self: &Arc<Self>) -> Arc<dyn PlatformConnection> {
        Arc::new(FakeConnection(Arc::clone(self)))
    }
}

struct FakeConnection(Arc<FakePlatform>);

#[async_trait]
impl PlatformConnection for FakeConnection {
    fn document_store(&self) -> PlatformResult<Arc<dyn DocumentStore>> {
        self.0.document_store_builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeDocumentStore(Arc::clone(&self.0.document_store))))
    }

    fn identity(&self) -> PlatformResult<Arc<dyn IdentityService>> {
        Ok(Arc::new(FakeIdentity(Arc::clone(&self.0.identity))))
    }

    fn blob_store(&self) -> PlatformResult<Arc<dyn BlobStore>> {
        if self.0.blob_store_misconfigured.load(Ordering::SeqCst) {
            return Err(PlatformError::NotConfigured("storage bucket".to_string()));
        }
        Ok(Arc::new(FakeBlobStore(Arc::clone(&self.0.blob_store))))
    }

    async fn close(&self) -> PlatformResult<()> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Never finishes connecting.
pub struct HangingConnector;

#[async_trait]
impl PlatformConnector for HangingConnector {
    async fn connect(&self) -> PlatformResult<Arc<dyn PlatformConnection>> {
        futures::future::pending().await
    }
}

pub fn test_config(max_attempts: u32) -> ConnectionConfig {
    ConnectionConfig {
        max_attempts,
        retry_delay: Duration::from_millis(100),
        init_timeout: Some(Duration::from_secs(60)),
        probe_timeout: Some(Duration::from_secs(5)),
    }
}

/// A connector that always hands out a connection to `platform`.
pub fn connector_for(platform: &Arc<FakePlatform>) -> MockConnector {
    let platform = Arc::clone(platform);
    let mut connector = MockConnector::new();
    connector
        .expect_connect()
        .returning(move || Ok(platform.connection()));
    connector
}

/// A manager that has completed `initialize` against `platform`.
pub async fn connected_manager(platform: &Arc<FakePlatform>, max_attempts: u32) -> Arc<ConnectionManager> {
    let manager = Arc::new(ConnectionManager::new(
        Arc::new(connector_for(platform)),
        test_config(max_attempts),
    ));
    manager
        .initialize(&CancellationToken::new())
        .await
        .expect("initial connection");
    manager
}
