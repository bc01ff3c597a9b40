use eduhub_core::{
    BlobStore, DocumentStore, IdentityService, PlatformConnection, PlatformError,
    PlatformResult, ServiceKind,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Default)]
struct Slots {
    connection: Option<Arc<dyn PlatformConnection>>,
    document_store: Option<Arc<dyn DocumentStore>>,
    identity: Option<Arc<dyn IdentityService>>,
    blob_store: Option<Arc<dyn BlobStore>>,
}

/// Lazily builds and memoizes the three sub-service clients.
///
/// The top-level connection and the memoized clients sit behind one lock, so
/// a client is never memoized against a connection that has been replaced.
#[derive(Default)]
pub struct ServiceHandleFactory {
    slots: Mutex<Slots>,
}

impl ServiceHandleFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a new top-level connection and drops every memoized client.
    /// Returns the connection it replaced.
    pub async fn install(
        &self,
        connection: Arc<dyn PlatformConnection>,
    ) -> Option<Arc<dyn PlatformConnection>> {
        let mut slots = self.slots.lock().await;
        let previous = slots.connection.replace(connection);
        clear_handles(&mut slots);
        previous
    }

    /// Removes the connection and every memoized client.
    pub async fn take(&self) -> Option<Arc<dyn PlatformConnection>> {
        let mut slots = self.slots.lock().await;
        clear_handles(&mut slots);
        slots.connection.take()
    }

    /// Drops the memoized clients, keeping the connection.
    pub async fn clear(&self) {
        clear_handles(&mut *self.slots.lock().await);
    }

    pub async fn has_connection(&self) -> bool {
        self.slots.lock().await.connection.is_some()
    }

    pub async fn is_memoized(&self, service: ServiceKind) -> bool {
        let slots = self.slots.lock().await;
        match service {
            ServiceKind::DocumentStore => slots.document_store.is_some(),
            ServiceKind::Identity => slots.identity.is_some(),
            ServiceKind::BlobStore => slots.blob_store.is_some(),
        }
    }

    pub async fn document_store(&self) -> PlatformResult<Arc<dyn DocumentStore>> {
        let mut slots = self.slots.lock().await;
        let Slots {
            connection,
            document_store,
            ..
        } = &mut *slots;
        memoize(
            ServiceKind::DocumentStore,
            document_store,
            connection.as_deref(),
            |c| c.document_store(),
        )
    }

    pub async fn identity(&self) -> PlatformResult<Arc<dyn IdentityService>> {
        let mut slots = self.slots.lock().await;
        let Slots {
            connection,
            identity,
            ..
        } = &mut *slots;
        memoize(ServiceKind::Identity, identity, connection.as_deref(), |c| {
            c.identity()
        })
    }

    pub async fn blob_store(&self) -> PlatformResult<Arc<dyn BlobStore>> {
        let mut slots = self.slots.lock().await;
        let Slots {
            connection,
            blob_store,
            ..
        } = &mut *slots;
        memoize(
            ServiceKind::BlobStore,
            blob_store,
            connection.as_deref(),
            |c| c.blob_store(),
        )
    }
}

fn clear_handles(slots: &mut Slots) {
    slots.document_store = None;
    slots.identity = None;
    slots.blob_store = None;
}

fn memoize<T: ?Sized>(
    service: ServiceKind,
    slot: &mut Option<Arc<T>>,
    connection: Option<&dyn PlatformConnection>,
    build: impl FnOnce(&dyn PlatformConnection) -> PlatformResult<Arc<T>>,
) -> PlatformResult<Arc<T>> {
    if let Some(handle) = slot.as_ref() {
        return Ok(Arc::clone(handle));
    }

    let connection = connection.ok_or(PlatformError::NotConnected)?;
    let handle = build(connection).map_err(|e| {
        warn!("Failed to construct {} client: {}", service, e);
        e
    })?;

    debug!("Constructed {} client", service);
    *slot = Some(Arc::clone(&handle));
    Ok(handle)
}
