//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: YAML config → client → session login →
//! paginated/GraphQL requests → logout

use futures::TryStreamExt;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Write;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zscaler_client::config::ENV_BEARER_TOKEN;
use zscaler_client::pagination::PageConfig;
use zscaler_client::{ClientConfig, Error, ZscalerClient};

const SESSION_PATH: &str = "/api/v1/authenticatedSession";

fn yaml_for(server: &MockServer, extra: &str) -> String {
    format!(
        r#"
base_url: "{}"
credentials:
  username: admin@example.com
  password: s3cret
  api_key: abcdefghijklmnop
rate_limit:
  enabled: false
http:
  backoff:
    type: constant
    initial_delay_ms: 10
{extra}"#,
        server.uri()
    )
}

fn client_for(server: &MockServer, extra: &str) -> ZscalerClient {
    let config = ClientConfig::from_yaml(&yaml_for(server, extra)).unwrap();
    ZscalerClient::from_config(&config).unwrap()
}

async fn mount_session(server: &MockServer, session_id: &str) {
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "set-cookie",
                    format!("JSESSIONID={session_id}; Path=/; Secure; HttpOnly").as_str(),
                )
                .set_body_json(json!({"authType": "ADMIN_LOGIN", "obfuscateApiKey": true})),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_user_pages(server: &MockServer, cookie: &str, pages: &[Vec<Value>]) {
    for (i, items) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path("/api/v1/users"))
            .and(query_param("page", (i + 1).to_string().as_str()))
            .and(header("Cookie", cookie))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(items.clone())))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(query_param("page", (pages.len() + 1).to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;
}

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

// ============================================================================
// Session Flow
// ============================================================================

#[tokio::test]
async fn test_session_list_and_logout() {
    let server = MockServer::start().await;
    mount_session(&server, "e2e").await;
    mount_user_pages(
        &server,
        "JSESSIONID=e2e",
        &[
            vec![json!({"id": 1, "name": "Alice"}), json!({"id": 2, "name": "Bob"})],
            vec![json!({"id": 3, "name": "Carol"})],
        ],
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path(SESSION_PATH))
        .and(header("Cookie", "JSESSIONID=e2e"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "");
    let users: Vec<User> = client.list_all("/api/v1/users").await.unwrap();

    assert_eq!(
        users.iter().map(|u| u.name.as_str()).collect::<Vec<_>>(),
        vec!["Alice", "Bob", "Carol"]
    );
    client.logout().await.unwrap();
}

#[tokio::test]
async fn test_explicit_login_then_requests_reuse_session() {
    let server = MockServer::start().await;
    mount_session(&server, "early").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status"))
        .and(header("Cookie", "JSESSIONID=early"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ACTIVE"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, "");
    let session = client.login().await.unwrap();
    assert_eq!(session.id, "early");
    assert_eq!(session.info.obfuscate_api_key, Some(true));

    for _ in 0..2 {
        let status: Value = client.http().get_json("/api/v1/status").await.unwrap();
        assert_eq!(status["status"], "ACTIVE");
    }
}

#[tokio::test]
async fn test_bad_credentials_surface_as_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "AUTHENTICATION_FAILED",
            "message": "Invalid credentials"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, "");
    let err = client.http().get("/api/v1/users").await.unwrap_err();
    assert!(matches!(err, Error::Auth { .. }));
}

// ============================================================================
// Pagination
// ============================================================================

#[tokio::test]
async fn test_paginate_with_configured_items_path() {
    let server = MockServer::start().await;
    mount_session(&server, "wrapped").await;

    for page in 1..=3u32 {
        Mock::given(method("GET"))
            .and(path("/api/v1/urlCategories"))
            .and(query_param("page", page.to_string().as_str()))
            .and(query_param("pageSize", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalPages": 3,
                "list": [{"id": page * 10}, {"id": page * 10 + 1}]
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(
        &server,
        "pagination:\n  page_size: 2\n  items_path: list\n  total_pages_path: totalPages\n",
    );

    let pages: Vec<_> = client
        .paginate("/api/v1/urlCategories")
        .into_stream()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(pages.len(), 3);
    assert_eq!(pages[2].items, vec![json!({"id": 30}), json!({"id": 31})]);
}

#[tokio::test]
async fn test_paginate_with_item_cap() {
    let server = MockServer::start().await;
    mount_session(&server, "capped").await;
    mount_user_pages(
        &server,
        "JSESSIONID=capped",
        &[
            (0..3).map(|i| json!({"id": i, "name": "u"})).collect(),
            (3..6).map(|i| json!({"id": i, "name": "u"})).collect(),
        ],
    )
    .await;

    let client = client_for(&server, "");
    let items = client
        .paginate_with("/api/v1/users", PageConfig::new().max_items(4))
        .collect_all()
        .await
        .unwrap();

    assert_eq!(items.len(), 4);
    assert_eq!(items[3]["id"], 3);
}

// ============================================================================
// Z-Insights
// ============================================================================

#[tokio::test]
async fn test_zinsights_query_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zins/graphql"))
        .and(header("Authorization", "Bearer zins-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"WEB_TRAFFIC": {"obfuscated": false, "entries": [{"name": "a", "total": 7}]}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = ClientConfig::from_yaml(&format!(
        "base_url: \"{}\"\nrate_limit:\n  enabled: false\n",
        server.uri()
    ))
    .unwrap();
    config
        .apply_env_with(|name| (name == ENV_BEARER_TOKEN).then(|| "zins-token".to_string()))
        .unwrap();
    let client = ZscalerClient::from_config(&config).unwrap();

    let data: Value = client
        .zinsights()
        .query("{ WEB_TRAFFIC { entries { name total } } }", None)
        .await
        .unwrap();
    assert_eq!(data["WEB_TRAFFIC"]["entries"][0]["total"], 7);

    // Bearer clients have no session to establish or end
    assert!(matches!(client.login().await, Err(Error::Auth { .. })));
    client.logout().await.unwrap();
}

// ============================================================================
// Cache and Rate Limits
// ============================================================================

#[tokio::test]
async fn test_cache_from_config() {
    let server = MockServer::start().await;
    mount_session(&server, "cached").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "cache:\n  enabled: true\n  ttl_seconds: 60\n");

    client.http().get("/api/v1/locations").await.unwrap();
    client.http().get("/api/v1/locations").await.unwrap();
    client
        .http()
        .put("/api/v1/locations", json!({"id": 1}))
        .await
        .unwrap();
    client.http().get("/api/v1/locations").await.unwrap();

    let stats = client.http().cache().unwrap().stats();
    assert_eq!(stats.hits, 1);
}

#[tokio::test]
async fn test_write_rate_limit_from_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/status/activate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ACTIVE"})))
        .expect(3)
        .mount(&server)
        .await;

    let config = ClientConfig::from_yaml(&format!(
        r#"
base_url: "{}"
credentials:
  bearer_token: tok
rate_limit:
  window_ms: 150
  read_limit: 10
  write_limit: 1
"#,
        server.uri()
    ))
    .unwrap();
    let client = ZscalerClient::from_config(&config).unwrap();

    let start = Instant::now();
    for _ in 0..3 {
        client
            .http()
            .post("/api/v1/status/activate", json!({}))
            .await
            .unwrap();
    }
    assert!(start.elapsed() >= Duration::from_millis(280));
}

// ============================================================================
// Configuration
// ============================================================================

#[tokio::test]
async fn test_client_from_config_file() {
    let server = MockServer::start().await;
    mount_session(&server, "file").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ACTIVE"})))
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml_for(&server, "").as_bytes()).unwrap();

    let config = ClientConfig::from_file(file.path()).unwrap();
    let client = ZscalerClient::from_config(&config).unwrap();
    client.http().get("/api/v1/status").await.unwrap();
}

#[test]
fn test_from_config_rejects_invalid_config() {
    let config = ClientConfig::from_yaml(
        "credentials:\n  username: a\n  password: b\n  api_key: short\n",
    )
    .unwrap();
    let err = ZscalerClient::from_config(&config).unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));
}
