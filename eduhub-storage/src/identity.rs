use async_trait::async_trait;
use eduhub_core::{IdentityService, PlatformResult, UserRecord};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::TokenSource;
use crate::http::{endpoint, send_json};

#[derive(Debug, Default, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    local_id: [&'a str; 1],
}

/// Identity service client over the platform's REST API.
pub struct RestIdentityService {
    client: Client,
    tokens: Arc<dyn TokenSource>,
    base_url: String,
    project_id: String,
}

impl RestIdentityService {
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
        }
    }

    fn accounts_url(&self, method: &str) -> PlatformResult<url::Url> {
        endpoint(
            &self.base_url,
            ["v1", "projects", self.project_id.as_str(), method],
        )
    }
}

#[async_trait]
impl IdentityService for RestIdentityService {
    async fn list_users(&self, max_results: u32) -> PlatformResult<Vec<UserRecord>> {
        let mut url = self.accounts_url("accounts:batchGet")?;
        url.query_pairs_mut()
            .append_pair("maxResults", &max_results.to_string());

        let response: Option<UsersResponse> =
            send_json(self.client.get(url), self.tokens.as_ref()).await?;
        Ok(response.unwrap_or_default().users)
    }

    async fn get_user(&self, uid: &str) -> PlatformResult<Option<UserRecord>> {
        let url = self.accounts_url("accounts:lookup")?;
        let request = self.client.post(url).json(&LookupRequest { local_id: [uid] });

        let response: Option<UsersResponse> = send_json(request, self.tokens.as_ref()).await?;
        Ok(response.and_then(|r| r.users.into_iter().next()))
    }
}
