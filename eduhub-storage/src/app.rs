use async_trait::async_trait;
use eduhub_core::{
    BlobStore, Credentials, DocumentStore, IdentityService, PlatformConnection, PlatformConnector,
    PlatformError, PlatformResult, PlatformSettings,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::auth::{MetadataTokenSource, ServiceAccountTokenSource, TokenSource};
use crate::blob::RestBlobStore;
use crate::document::RestDocumentStore;
use crate::identity::RestIdentityService;

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-account/default/token";

/// Base URLs of the platform APIs. Overridable for emulators and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEndpoints {
    pub document_store: String,
    pub identity: String,
    pub blob_store: String,
    pub token: String,
    pub metadata_token: String,
}

impl Default for PlatformEndpoints {
    fn default() -> Self {
        Self {
            document_store: "https://firestore.googleapis.com".to_string(),
            identity: "https://identitytoolkit.googleapis.com".to_string(),
            blob_store: "https://storage.googleapis.com".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            metadata_token: format!("http://metadata.google.internal{}", METADATA_TOKEN_PATH),
        }
    }
}

impl PlatformEndpoints {
    /// Points every API at one base URL, as a local emulator or mock server exposes them.
    pub fn single_host(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            document_store: base.to_string(),
            identity: base.to_string(),
            blob_store: base.to_string(),
            token: format!("{}/token", base),
            metadata_token: format!("{}{}", base, METADATA_TOKEN_PATH),
        }
    }
}

/// HTTP client settings shared by every sub-service client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("eduhub/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    fn build_client(&self) -> PlatformResult<Client> {
        Ok(Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(&self.user_agent)
            .build()?)
    }
}

/// Top-level connection to the managed platform.
///
/// Builds the sub-service clients on request; after [`PlatformConnection::close`]
/// every construction fails with [`PlatformError::Closed`].
pub struct PlatformApp {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    settings: PlatformSettings,
    endpoints: PlatformEndpoints,
    closed: AtomicBool,
}

impl PlatformApp {
    pub fn new(
        client: Client,
        tokens: Arc<dyn TokenSource>,
        settings: PlatformSettings,
        endpoints: PlatformEndpoints,
    ) -> Self {
        Self {
            client,
            tokens,
            settings,
            endpoints,
            closed: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &PlatformSettings {
        &self.settings
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> PlatformResult<()> {
        if self.is_closed() {
            Err(PlatformError::Closed)
        } else {
            Ok(())
        }
    }

    fn project_id(&self) -> PlatformResult<&str> {
        self.settings
            .project_id
            .as_deref()
            .ok_or_else(|| PlatformError::NotConfigured("project id".to_string()))
    }
}

#[async_trait]
impl PlatformConnection for PlatformApp {
    fn document_store(&self) -> PlatformResult<Arc<dyn DocumentStore>> {
        self.ensure_open()?;
        let project_id = self.project_id()?;
        debug!("Building document store client for project {}", project_id);
        Ok(Arc::new(RestDocumentStore::new(
            self.client.clone(),
            Arc::clone(&self.tokens),
            &self.endpoints.document_store,
            project_id,
        )))
    }

    fn identity(&self) -> PlatformResult<Arc<dyn IdentityService>> {
        self.ensure_open()?;
        let project_id = self.project_id()?;
        debug!("Building identity client for project {}", project_id);
        Ok(Arc::new(RestIdentityService::new(
            self.client.clone(),
            Arc::clone(&self.tokens),
            &self.endpoints.identity,
            project_id,
        )))
    }

    fn blob_store(&self) -> PlatformResult<Arc<dyn BlobStore>> {
        self.ensure_open()?;
        let bucket = self
            .settings
            .storage_bucket
            .as_deref()
            .ok_or_else(|| PlatformError::NotConfigured("storage bucket".to_string()))?;
        debug!("Building blob store client for bucket {}", bucket);
        Ok(Arc::new(RestBlobStore::new(
            self.client.clone(),
            Arc::clone(&self.tokens),
            &self.endpoints.blob_store,
            bucket,
        )))
    }

    async fn close(&self) -> PlatformResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(PlatformError::Closed);
        }
        self.tokens.clear().await;
        info!("Platform connection closed");
        Ok(())
    }
}

/// Connects to the platform with the credentials described by [`PlatformSettings`].
pub struct PlatformAppConnector {
    settings: PlatformSettings,
    endpoints: PlatformEndpoints,
    http: HttpClientConfig,
}

impl PlatformAppConnector {
    pub fn new(settings: PlatformSettings) -> Self {
        Self {
            settings,
            endpoints: PlatformEndpoints::default(),
            http: HttpClientConfig::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: PlatformEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_http_config(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    fn token_source(&self, client: Client) -> PlatformResult<Arc<dyn TokenSource>> {
        match &self.settings.credentials {
            Credentials::ServiceAccount {
                client_email,
                private_key,
            } => Ok(Arc::new(ServiceAccountTokenSource::new(
                client,
                client_email.as_str(),
                private_key,
                &self.endpoints.token,
            )?)),
            Credentials::Ambient => Ok(Arc::new(MetadataTokenSource::new(
                client,
                &self.endpoints.metadata_token,
            ))),
        }
    }
}

#[async_trait]
impl PlatformConnector for PlatformAppConnector {
    async fn connect(&self) -> PlatformResult<Arc<dyn PlatformConnection>> {
        let client = self.http.build_client()?;
        let tokens = self.token_source(client.clone())?;

        // An unusable credential should fail the attempt, not the first request.
        tokens.access_token().await?;

        info!(
            "Connected to platform (project: {}, context: {:?})",
            self.settings.project_id.as_deref().unwrap_or("<unset>"),
            self.settings.context
        );

        Ok(Arc::new(PlatformApp::new(
            client,
            tokens,
            self.settings.clone(),
            self.endpoints.clone(),
        )))
    }
}
