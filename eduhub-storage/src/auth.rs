use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use eduhub_core::{PlatformError, PlatformResult};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::RwLock;
use tracing::debug;

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

pub const DEFAULT_SCOPES: &str =
    "https://www.googleapis.com/auth/cloud-platform https://www.googleapis.com/auth/userinfo.email";

const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Source of OAuth2 bearer tokens for platform calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> PlatformResult<String>;

    /// Drops any cached token.
    async fn clear(&self);
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > Utc::now()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

async fn cached_or_fetch<F, Fut>(
    cache: &RwLock<Option<CachedToken>>,
    fetch: F,
) -> PlatformResult<String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = PlatformResult<TokenResponse>>,
{
    if let Some(token) = cache.read().await.as_ref().filter(|t| t.is_fresh()) {
        return Ok(token.value.clone());
    }

    let mut slot = cache.write().await;
    if let Some(token) = slot.as_ref().filter(|t| t.is_fresh()) {
        return Ok(token.value.clone());
    }

    let response = fetch().await?;
    debug!("Fetched access token valid for {}s", response.expires_in);
    *slot = Some(CachedToken {
        value: response.access_token.clone(),
        expires_at: Utc::now() + Duration::seconds(response.expires_in),
    });
    Ok(response.access_token)
}

async fn decode_token_response(response: Response) -> PlatformResult<TokenResponse> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PlatformError::Credentials(format!(
            "token endpoint returned {}: {}",
            status, body
        )));
    }
    Ok(response.json().await?)
}

/// Exchanges a signed service-account assertion for access tokens.
pub struct ServiceAccountTokenSource {
    client: Client,
    client_email: String,
    key: EncodingKey,
    token_endpoint: String,
    scopes: String,
    cache: RwLock<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(
        client: Client,
        client_email: impl Into<String>,
        private_key_pem: &str,
        token_endpoint: impl Into<String>,
    ) -> PlatformResult<Self> {
        let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| PlatformError::Credentials(format!("invalid private key: {}", e)))?;

        Ok(Self {
            client,
            client_email: client_email.into(),
            key,
            token_endpoint: token_endpoint.into(),
            scopes: DEFAULT_SCOPES.to_string(),
            cache: RwLock::new(None),
        })
    }

    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = scopes.into();
        self
    }

    fn assertion(&self) -> PlatformResult<String> {
        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: &self.scopes,
            aud: &self.token_endpoint,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(|e| PlatformError::Credentials(format!("failed to sign assertion: {}", e)))
    }

    async fn fetch(&self) -> PlatformResult<TokenResponse> {
        let assertion = self.assertion()?;
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        decode_token_response(response).await
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> PlatformResult<String> {
        cached_or_fetch(&self.cache, || self.fetch()).await
    }

    async fn clear(&self) {
        *self.cache.write().await = None;
    }
}

/// Tokens from the managed runtime's metadata server.
pub struct MetadataTokenSource {
    client: Client,
    endpoint: String,
    cache: RwLock<Option<CachedToken>>,
}

impl MetadataTokenSource {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            cache: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> PlatformResult<TokenResponse> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?;
        decode_token_response(response).await
    }
}

#[async_trait]
impl TokenSource for MetadataTokenSource {
    async fn access_token(&self) -> PlatformResult<String> {
        cached_or_fetch(&self.cache, || self.fetch()).await
    }

    async fn clear(&self) {
        *self.cache.write().await = None;
    }
}

/// Fixed token, for local emulators.
#[derive(Debug, Clone)]
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> PlatformResult<String> {
        Ok(self.0.clone())
    }

    async fn clear(&self) {}
}
