// Integration tests for the authenticated Graph call wrapper:
// the try / refresh-once / retry-once state machine against a mock
// provider and resource API.

use std::sync::Arc;

use graphgate::credentials::{CredentialKey, CredentialStore, TokenSet};
use graphgate::crypto::TokenCipher;
use graphgate::error::Error;
use graphgate::graph::GraphClient;
use graphgate::oauth::{MicrosoftOAuthConfig, OAuthClient};
use mockito::{Matcher, Server, ServerGuard};

fn test_store() -> Arc<CredentialStore> {
    let cipher = Arc::new(TokenCipher::new("graph-flow-secret").unwrap());
    Arc::new(CredentialStore::new(":memory:", cipher).unwrap())
}

fn test_client(server: &ServerGuard, store: Arc<CredentialStore>) -> GraphClient {
    let oauth = Arc::new(OAuthClient::with_token_url(
        MicrosoftOAuthConfig {
            client_id: "client-123".to_string(),
            client_secret: "secret-456".to_string(),
            tenant: "common".to_string(),
            redirect_uri: "http://localhost:5000/cb".to_string(),
            scopes: vec!["openid".to_string(), "offline_access".to_string()],
        },
        format!("{}/token", server.url()),
    ));
    GraphClient::with_base_url(oauth, store, server.url())
}

fn stored_tokens() -> TokenSet {
    TokenSet {
        access_token: "stale-access".to_string(),
        refresh_token: "stored-refresh".to_string(),
        id_token: "stored-id".to_string(),
    }
}

fn token_endpoint_body(access: &str, refresh: &str) -> String {
    format!(
        r#"{{
            "token_type": "Bearer",
            "scope": "openid offline_access",
            "expires_in": 3599,
            "ext_expires_in": 3599,
            "access_token": "{access}",
            "refresh_token": "{refresh}",
            "id_token": "fresh-id"
        }}"#
    )
}

const ACCOUNT_BODY: &str = r#"{
    "id": "ms-user-1",
    "displayName": "Alice Example",
    "mail": "alice@example.com",
    "userPrincipalName": "alice@example.com"
}"#;

#[tokio::test]
async fn test_success_on_first_attempt() {
    let mut server = Server::new_async().await;
    let store = test_store();
    let key = CredentialKey::user("u1");
    store.upsert(&key, &stored_tokens()).unwrap();

    let account_mock = server
        .mock("GET", "/me")
        .match_header("authorization", "Bearer stale-access")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ACCOUNT_BODY)
        .expect(1)
        .create_async()
        .await;
    let token_mock = server
        .mock("POST", "/token")
        .expect(0)
        .create_async()
        .await;

    let client = test_client(&server, store);
    let account = client.get_account(&key).await.unwrap();

    account_mock.assert_async().await;
    token_mock.assert_async().await;
    assert_eq!(account.id, "ms-user-1");
    assert_eq!(account.display_name.as_deref(), Some("Alice Example"));
}

#[tokio::test]
async fn test_expired_token_refreshes_and_retries() {
    let mut server = Server::new_async().await;
    let store = test_store();
    let key = CredentialKey::user("u1");
    store.upsert(&key, &stored_tokens()).unwrap();

    // Stored access token is rejected; the refreshed one is accepted
    let stale_mock = server
        .mock("GET", "/me")
        .match_header("authorization", "Bearer stale-access")
        .with_status(401)
        .with_body(r#"{"error": {"code": "InvalidAuthenticationToken"}}"#)
        .expect(1)
        .create_async()
        .await;
    let fresh_mock = server
        .mock("GET", "/me")
        .match_header("authorization", "Bearer new-access")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ACCOUNT_BODY)
        .expect(1)
        .create_async()
        .await;
    let token_mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "stored-refresh".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_endpoint_body("new-access", "rotated-refresh"))
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server, store.clone());
    let account = client.get_account(&key).await.unwrap();

    stale_mock.assert_async().await;
    fresh_mock.assert_async().await;
    token_mock.assert_async().await;
    assert_eq!(account.id, "ms-user-1");

    // The provider rotated the refresh token; the stored record must
    // reflect the new one, not the one that was just consumed
    let persisted = store.get(&key).unwrap().unwrap();
    assert_eq!(persisted.access_token, "new-access");
    assert_eq!(persisted.refresh_token, "rotated-refresh");
    assert_eq!(persisted.id_token, "fresh-id");
}

#[tokio::test]
async fn test_single_retry_bound() {
    let mut server = Server::new_async().await;
    let store = test_store();
    let key = CredentialKey::user("u1");
    store.upsert(&key, &stored_tokens()).unwrap();

    // Resource API rejects every token; refresh always succeeds.
    // The wrapper must stop after one refresh and two resource attempts.
    let resource_mock = server
        .mock("GET", "/me")
        .match_header("authorization", Matcher::Any)
        .with_status(401)
        .with_body(r#"{"error": {"code": "InvalidAuthenticationToken"}}"#)
        .expect(2)
        .create_async()
        .await;
    let token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_endpoint_body("new-access", "rotated-refresh"))
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server, store);
    let err = client.get_account(&key).await.unwrap_err();

    resource_mock.assert_async().await;
    token_mock.assert_async().await;
    assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn test_no_credentials_makes_zero_calls() {
    let mut server = Server::new_async().await;
    let store = test_store();

    let resource_mock = server.mock("GET", "/me").expect(0).create_async().await;
    let token_mock = server.mock("POST", "/token").expect(0).create_async().await;

    let client = test_client(&server, store);
    let err = client
        .get_account(&CredentialKey::user("nobody"))
        .await
        .unwrap_err();

    resource_mock.assert_async().await;
    token_mock.assert_async().await;
    assert!(matches!(err, Error::NoCredentials(_)));
}

#[tokio::test]
async fn test_rejected_refresh_is_unauthorized() {
    let mut server = Server::new_async().await;
    let store = test_store();
    let key = CredentialKey::user("u1");
    store.upsert(&key, &stored_tokens()).unwrap();

    let _resource_mock = server
        .mock("GET", "/me")
        .with_status(401)
        .with_body(r#"{"error": {"code": "InvalidAuthenticationToken"}}"#)
        .expect(1)
        .create_async()
        .await;
    let _token_mock = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error": "invalid_grant", "error_description": "AADSTS70000: revoked"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server, store.clone());
    let err = client.get_account(&key).await.unwrap_err();

    // A revoked grant surfaces as the state machine's terminal kind, and
    // the stale record stays on file for the next explicit re-consent
    assert!(matches!(err, Error::Unauthorized));
    assert!(store.get(&key).unwrap().is_some());
}

#[tokio::test]
async fn test_forced_refresh_surfaces_provider_rejection() {
    let mut server = Server::new_async().await;
    let store = test_store();
    let key = CredentialKey::user("u1");
    store.upsert(&key, &stored_tokens()).unwrap();

    let _token_mock = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error": "invalid_grant"}"#)
        .create_async()
        .await;

    let client = test_client(&server, store);

    // Outside the wrapper's recovery leg the exchange failure keeps its
    // own kind instead of collapsing into Unauthorized
    let err = client.refresh_tokens(&key).await.unwrap_err();
    assert!(matches!(err, Error::ExternalAuth(_)));
}

#[tokio::test]
async fn test_forced_refresh_without_grant() {
    let server = Server::new_async().await;
    let store = test_store();

    let client = test_client(&server, store);
    let err = client
        .refresh_tokens(&CredentialKey::user("nobody"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoCredentials(_)));
}

#[tokio::test]
async fn test_upload_file() {
    let mut server = Server::new_async().await;
    let store = test_store();
    let key = CredentialKey::email("alice@example.com");
    store.upsert(&key, &stored_tokens()).unwrap();

    let upload_mock = server
        .mock("PUT", "/me/drive/root:/mail/message-1.html:/content")
        .match_header("authorization", "Bearer stale-access")
        .match_header("content-type", "text/html")
        .match_body("<html>hello</html>")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "item-1", "name": "message-1.html", "webUrl": "https://contoso-my.sharepoint.com/f/item-1"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = test_client(&server, store);
    let item = client
        .upload_file(
            &key,
            "mail/message-1.html",
            "text/html",
            b"<html>hello</html>".to_vec(),
        )
        .await
        .unwrap();

    upload_mock.assert_async().await;
    assert_eq!(item.id, "item-1");
    assert_eq!(item.name, "message-1.html");
}

#[tokio::test]
async fn test_drive_listing() {
    let mut server = Server::new_async().await;
    let store = test_store();
    let key = CredentialKey::user("u1");
    store.upsert(&key, &stored_tokens()).unwrap();

    let _mock = server
        .mock("GET", "/me/drive/root/children")
        .match_header("authorization", "Bearer stale-access")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "value": [
                    {"id": "item-1", "name": "report.docx", "size": 2048,
                     "webUrl": "https://contoso-my.sharepoint.com/f/item-1",
                     "lastModifiedDateTime": "2026-07-01T09:00:00Z"},
                    {"id": "item-2", "name": "notes.txt", "size": 12}
                ]
            }"#,
        )
        .create_async()
        .await;

    let client = test_client(&server, store);
    let listing = client.list_drive_items(&key).await.unwrap();

    assert_eq!(listing.value.len(), 2);
    assert_eq!(listing.value[0].name, "report.docx");
    assert_eq!(listing.value[0].size, Some(2048));
    assert_eq!(listing.value[1].web_url, None);
}

#[tokio::test]
async fn test_concurrent_calls_share_one_refresh() {
    let mut server = Server::new_async().await;
    let store = test_store();
    let key = CredentialKey::user("u1");
    store.upsert(&key, &stored_tokens()).unwrap();

    let _stale_mock = server
        .mock("GET", "/me")
        .match_header("authorization", "Bearer stale-access")
        .with_status(401)
        .with_body(r#"{"error": {"code": "InvalidAuthenticationToken"}}"#)
        .expect(2)
        .create_async()
        .await;
    let _fresh_mock = server
        .mock("GET", "/me")
        .match_header("authorization", "Bearer new-access")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ACCOUNT_BODY)
        .expect(2)
        .create_async()
        .await;
    // The per-principal lock means the second caller reuses the grant the
    // first one stored instead of spending the rotated refresh token again
    let token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(token_endpoint_body("new-access", "rotated-refresh"))
        .expect(1)
        .create_async()
        .await;

    let client = Arc::new(test_client(&server, store));
    let (left, right) = tokio::join!(
        client.get_account(&key),
        client.get_account(&key)
    );

    token_mock.assert_async().await;
    assert!(left.is_ok());
    assert!(right.is_ok());
}
