use async_trait::async_trait;
use eduhub_core::{DocumentStore, PlatformResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::auth::TokenSource;
use crate::http::{endpoint, send_json};

pub const DEFAULT_DATABASE: &str = "(default)";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsRequest {
    page_size: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCollectionIdsResponse {
    #[serde(default)]
    collection_ids: Vec<String>,
}

/// Document store client over the platform's REST API.
pub struct RestDocumentStore {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
    project_id: String,
    database: String,
}

impl RestDocumentStore {
    pub fn new(
        client: Client,
        tokens: Arc<dyn TokenSource>,
        base_url: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            tokens,
            base_url: base_url.into(),
            project_id: project_id.into(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    fn documents_root(&self) -> Vec<String> {
        vec![
            "v1".to_string(),
            "projects".to_string(),
            self.project_id.clone(),
            "databases".to_string(),
            self.database.clone(),
            "documents".to_string(),
        ]
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn list_collection_ids(&self, page_size: u32) -> PlatformResult<Vec<String>> {
        let mut segments = self.documents_root();
        if let Some(last) = segments.last_mut() {
            last.push_str(":listCollectionIds");
        }
        let url = endpoint(&self.base_url, segments)?;

        let request = self
            .client
            .post(url)
            .json(&ListCollectionIdsRequest { page_size });
        let response: Option<ListCollectionIdsResponse> =
            send_json(request, self.tokens.as_ref()).await?;

        Ok(response.unwrap_or_default().collection_ids)
    }

    async fn get_document(&self, path: &str) -> PlatformResult<Option<Value>> {
        let mut segments = self.documents_root();
        segments.extend(
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        );
        let url = endpoint(&self.base_url, segments)?;

        send_json(self.client.get(url), self.tokens.as_ref()).await
    }
}
