mod support;

use eduhub_core::PlatformError;
use eduhub_storage::auth::JWT_BEARER_GRANT;
use eduhub_storage::{MetadataTokenSource, ServiceAccountTokenSource, TokenSource};
use jsonwebtoken::{decode_header, Algorithm};
use serde_json::json;
use support::*;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_source(server: &MockServer) -> ServiceAccountTokenSource {
    ServiceAccountTokenSource::new(
        reqwest::Client::new(),
        TEST_CLIENT_EMAIL,
        TEST_PRIVATE_KEY,
        format!("{}/token", server.uri()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_service_account_exchanges_signed_assertion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = token_source(&server);
    assert_eq!(source.access_token().await.unwrap(), "ya29.test-token");

    let requests = server.received_requests().await.unwrap();
    let form: Vec<(String, String)> = url::form_urlencoded::parse(&requests[0].body)
        .into_owned()
        .collect();

    let grant = form.iter().find(|(k, _)| k == "grant_type").map(|(_, v)| v.as_str());
    assert_eq!(grant, Some(JWT_BEARER_GRANT));

    let assertion = form
        .iter()
        .find(|(k, _)| k == "assertion")
        .map(|(_, v)| v.clone())
        .expect("assertion present");
    let header = decode_header(&assertion).unwrap();
    assert_eq!(header.alg, Algorithm::RS256);
}

#[tokio::test]
async fn test_service_account_token_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "cached-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = token_source(&server);
    for _ in 0..3 {
        assert_eq!(source.access_token().await.unwrap(), "cached-token");
    }
}

#[tokio::test]
async fn test_clear_forces_refetch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&server)
        .await;

    let source = token_source(&server);
    source.access_token().await.unwrap();
    source.clear().await;
    source.access_token().await.unwrap();
}

#[tokio::test]
async fn test_rejected_assertion_is_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let err = token_source(&server).access_token().await.unwrap_err();
    match err {
        PlatformError::Credentials(message) => assert!(message.contains("invalid_grant")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_metadata_token_sends_flavor_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/computeMetadata/v1/instance/service-account/default/token"))
        .and(header("Metadata-Flavor", "Google"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "metadata-token",
            "expires_in": 1800,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = MetadataTokenSource::new(
        reqwest::Client::new(),
        format!(
            "{}/computeMetadata/v1/instance/service-account/default/token",
            server.uri()
        ),
    );
    assert_eq!(source.access_token().await.unwrap(), "metadata-token");
}
