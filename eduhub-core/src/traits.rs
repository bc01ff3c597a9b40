use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::domain::{ObjectMetadata, UserRecord};
use crate::error::PlatformResult;

/// Structured-data storage sub-service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_collection_ids(&self, page_size: u32) -> PlatformResult<Vec<String>>;

    /// Fetches one document by its slash-separated path. `None` if absent.
    async fn get_document(&self, path: &str) -> PlatformResult<Option<Value>>;
}

/// Authentication and user-directory sub-service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn list_users(&self, max_results: u32) -> PlatformResult<Vec<UserRecord>>;

    async fn get_user(&self, uid: &str) -> PlatformResult<Option<UserRecord>>;
}

/// Binary/file storage sub-service, bound to one bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn bucket(&self) -> &str;

    async fn bucket_exists(&self) -> PlatformResult<bool>;

    async fn object_metadata(&self, name: &str) -> PlatformResult<Option<ObjectMetadata>>;
}

/// The top-level connection to the managed platform.
///
/// Client construction is synchronous; only `close` talks to the network.
#[async_trait]
pub trait PlatformConnection: Send + Sync {
    fn document_store(&self) -> PlatformResult<Arc<dyn DocumentStore>>;

    fn identity(&self) -> PlatformResult<Arc<dyn IdentityService>>;

    fn blob_store(&self) -> PlatformResult<Arc<dyn BlobStore>>;

    /// Tears the connection down. Clients built from it stop working.
    async fn close(&self) -> PlatformResult<()>;
}

/// Establishes a top-level platform connection.
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn connect(&self) -> PlatformResult<Arc<dyn PlatformConnection>>;
}
