//! Integration tests for the SATUSEHAT FHIR client against a mock gateway

use mera::adapters::satusehat::{FhirClient, ResourceEndpoint, ResourceSender, TokenProvider};
use mera::config::{secret_string, SatuSehatConfig};
use mera::domain::{BridgeError, FhirDocument, FhirError, ResourceKind};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;

fn config(server: &ServerGuard) -> SatuSehatConfig {
    SatuSehatConfig {
        auth_url: format!("{}/oauth2/v1", server.url()),
        fhir_url: format!("{}/fhir-r4/v1", server.url()),
        client_id: "mera-client".to_string(),
        client_secret: secret_string("mera-secret".to_string()),
        identity_system: "https://fhir.kemkes.go.id/id/nik".to_string(),
        timeout_seconds: 5,
        token_safety_margin_seconds: 60,
        tls_verify: true,
    }
}

async fn mock_token(server: &mut ServerGuard, hits: usize) -> mockito::Mock {
    server
        .mock("POST", "/oauth2/v1/accesstoken")
        .match_query(Matcher::UrlEncoded(
            "grant_type".into(),
            "client_credentials".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"tok-1","expires_in":"3599"}"#)
        .expect(hits)
        .create_async()
        .await
}

fn client(server: &ServerGuard) -> Arc<FhirClient> {
    let config = config(server);
    let tokens = Arc::new(TokenProvider::new(&config).unwrap());
    Arc::new(FhirClient::new(&config, tokens).unwrap())
}

fn encounter() -> FhirDocument {
    FhirDocument::new(
        ResourceKind::Encounter,
        json!({"status": "arrived", "class": {"code": "AMB"}}),
    )
    .unwrap()
}

#[tokio::test]
async fn test_create_returns_assigned_id() {
    let mut server = Server::new_async().await;
    let token = mock_token(&mut server, 1).await;
    let create = server
        .mock("POST", "/fhir-r4/v1/Encounter")
        .match_header("authorization", "Bearer tok-1")
        .match_body(Matcher::PartialJson(json!({"resourceType": "Encounter"})))
        .with_status(201)
        .with_body(r#"{"resourceType":"Encounter","id":"enc-001"}"#)
        .create_async()
        .await;

    let id = client(&server).create(&encounter()).await.unwrap();

    assert_eq!(id.as_str(), "enc-001");
    token.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn test_token_is_reused_across_creates() {
    let mut server = Server::new_async().await;
    let token = mock_token(&mut server, 1).await;
    let create = server
        .mock("POST", "/fhir-r4/v1/Encounter")
        .with_status(201)
        .with_body(r#"{"id":"enc-002"}"#)
        .expect(3)
        .create_async()
        .await;

    let client = client(&server);
    for _ in 0..3 {
        client.create(&encounter()).await.unwrap();
    }

    token.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn test_created_response_without_id_is_an_error() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 1).await;
    let _create = server
        .mock("POST", "/fhir-r4/v1/Encounter")
        .with_status(201)
        .with_body(r#"{"resourceType":"OperationOutcome"}"#)
        .create_async()
        .await;

    let err = client(&server).create(&encounter()).await.unwrap_err();

    assert!(matches!(
        err,
        BridgeError::Fhir(FhirError::MissingResourceId { .. })
    ));
    assert!(err.to_string().contains("OperationOutcome"));
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 1).await;
    let _create = server
        .mock("POST", "/fhir-r4/v1/Encounter")
        .with_status(503)
        .with_body("gateway unavailable")
        .create_async()
        .await;

    let err = client(&server).create(&encounter()).await.unwrap_err();

    match err {
        BridgeError::Fhir(FhirError::ServerError { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "gateway unavailable");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_response_drops_cached_token() {
    let mut server = Server::new_async().await;
    let token = mock_token(&mut server, 2).await;
    let _create = server
        .mock("POST", "/fhir-r4/v1/Encounter")
        .with_status(401)
        .with_body(r#"{"fault":"invalid token"}"#)
        .expect(2)
        .create_async()
        .await;

    let client = client(&server);
    let first = client.create(&encounter()).await.unwrap_err();
    assert!(matches!(
        first,
        BridgeError::Fhir(FhirError::ClientError { status: 401, .. })
    ));
    assert!(client.tokens().cached_token().await.is_none());

    // The next call authenticates again
    client.create(&encounter()).await.unwrap_err();
    token.assert_async().await;
}

#[tokio::test]
async fn test_endpoint_rejects_document_of_another_kind() {
    let server = Server::new_async().await;
    let endpoint = ResourceEndpoint::new(client(&server), ResourceKind::Condition);

    let err = endpoint.send(&encounter()).await.unwrap_err();

    assert!(matches!(err, BridgeError::Validation(_)));
}

#[tokio::test]
async fn test_patient_lookup_by_identity_number() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 1).await;
    let search = server
        .mock("GET", "/fhir-r4/v1/Patient")
        .match_query(Matcher::UrlEncoded(
            "identifier".into(),
            "https://fhir.kemkes.go.id/id/nik|3171012345678901".into(),
        ))
        .with_status(200)
        .with_body(
            r#"{"resourceType":"Bundle","total":1,"entry":[{"resource":{"resourceType":"Patient","id":"P02478375538"}}]}"#,
        )
        .create_async()
        .await;

    let id = client(&server)
        .lookup_patient("3171012345678901")
        .await
        .unwrap();

    assert_eq!(id.as_str(), "P02478375538");
    search.assert_async().await;
}

#[tokio::test]
async fn test_practitioner_lookup_with_no_match_is_not_found() {
    let mut server = Server::new_async().await;
    let _token = mock_token(&mut server, 1).await;
    let _search = server
        .mock("GET", "/fhir-r4/v1/Practitioner")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"resourceType":"Bundle","total":0,"entry":[]}"#)
        .create_async()
        .await;

    let err = client(&server)
        .lookup_practitioner("3171000000000000")
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::NotFound(_)));
}

#[tokio::test]
async fn test_lookup_rejects_blank_identity_number() {
    let server = Server::new_async().await;
    let err = client(&server).lookup_patient("  ").await.unwrap_err();
    assert!(matches!(err, BridgeError::Validation(_)));
}
