use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eduhub_core::{BlobStore, ObjectMetadata, PlatformError, PlatformResult};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::TokenSource;
use crate::http::{endpoint, send_json};

/// Wire form of an object resource; the API encodes `size` as a string.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    name: String,
    bucket: String,
    #[serde(default)]
    content_type: Option<String>,
    size: String,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
}

impl TryFrom<ObjectResource> for ObjectMetadata {
    type Error = PlatformError;

    fn try_from(resource: ObjectResource) -> Result<Self, Self::Error> {
        let size = resource
            .size
            .parse::<u64>()
            .map_err(|e| PlatformError::Decode(format!("invalid object size: {}", e)))?;

        Ok(ObjectMetadata {
            name: resource.name,
            bucket: resource.bucket,
            content_type: resource.content_type,
            size,
            updated: resource.updated,
        })
    }
}

/// Blob store client over the platform's JSON storage API.
pub struct RestBlobStore {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
    bucket: String,
}

impl RestBlobStore {
    pub fn new(
        client: Client,
        tokens: Arc<dyn TokenSource>,
        base_url: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.into(),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for RestBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn bucket_exists(&self) -> PlatformResult<bool> {
        let url = endpoint(&self.base_url, ["storage", "v1", "b", self.bucket.as_str()])?;
        let response: Option<Value> = send_json(self.client.get(url), self.tokens.as_ref()).await?;
        Ok(response.is_some())
    }

    async fn object_metadata(&self, name: &str) -> PlatformResult<Option<ObjectMetadata>> {
        let url = endpoint(
            &self.base_url,
            ["storage", "v1", "b", self.bucket.as_str(), "o", name],
        )?;
        let response: Option<ObjectResource> =
            send_json(self.client.get(url), self.tokens.as_ref()).await?;

        response.map(ObjectMetadata::try_from).transpose()
    }
}
