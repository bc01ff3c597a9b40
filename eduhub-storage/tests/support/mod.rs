#![allow(dead_code)]

use eduhub_core::{Credentials, ExecutionContext, PlatformSettings};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_PROJECT: &str = "eduhub-test";
pub const TEST_BUCKET: &str = "eduhub-test.appspot.com";
pub const TEST_CLIENT_EMAIL: &str = "backend@eduhub-test.iam.gserviceaccount.com";
pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");

/// Service-account settings with the fixture key.
pub fn service_account_settings() -> PlatformSettings {
    PlatformSettings {
        context: ExecutionContext::Standalone,
        project_id: Some(TEST_PROJECT.to_string()),
        database_url: Some("https://eduhub-test.firebaseio.com".to_string()),
        storage_bucket: Some(TEST_BUCKET.to_string()),
        credentials: Credentials::ServiceAccount {
            client_email: TEST_CLIENT_EMAIL.to_string(),
            private_key: TEST_PRIVATE_KEY.to_string(),
        },
    }
}

/// Serves a bearer token from `/token`.
pub async fn mount_token_endpoint(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(server)
        .await;
}
