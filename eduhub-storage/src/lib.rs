//! Managed-platform backend: token sources, REST clients for the three
//! sub-services, and the top-level [`PlatformApp`] connection.

pub mod app;
pub mod auth;
pub mod blob;
pub mod document;
pub mod identity;

mod http;

pub use app::{HttpClientConfig, PlatformApp, PlatformAppConnector, PlatformEndpoints};
pub use auth::{MetadataTokenSource, ServiceAccountTokenSource, StaticTokenSource, TokenSource};
pub use blob::RestBlobStore;
pub use document::RestDocumentStore;
pub use identity::RestIdentityService;
