//! Tests for the GraphQL module

use super::*;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base_url: String) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(base_url)
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct WebTraffic {
    #[serde(rename = "WEB_TRAFFIC")]
    web_traffic: Value,
}

#[test]
fn test_request_omits_missing_variables() {
    let request = GraphQlRequest::new("{ ping }");
    assert_eq!(serde_json::to_value(&request).unwrap(), json!({"query": "{ ping }"}));

    let request = request.variables(json!({"limit": 5}));
    assert_eq!(
        serde_json::to_value(&request).unwrap(),
        json!({"query": "{ ping }", "variables": {"limit": 5}})
    );
}

#[test]
fn test_into_data_errors_win() {
    let response: GraphQlResponse = serde_json::from_value(json!({
        "data": {"x": 1},
        "errors": [{"message": "first"}, {"message": "second", "path": ["x"]}]
    }))
    .unwrap();

    match response.into_data::<Value>() {
        Err(Error::GraphQl { messages }) => assert_eq!(messages, vec!["first", "second"]),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_into_data_requires_data() {
    let response: GraphQlResponse = serde_json::from_value(json!({"data": null})).unwrap();
    assert!(matches!(
        response.into_data::<Value>(),
        Err(Error::Decode { .. })
    ));

    let response: GraphQlResponse = serde_json::from_value(json!({})).unwrap();
    assert!(matches!(
        response.into_data::<Value>(),
        Err(Error::Decode { .. })
    ));
}

#[tokio::test]
async fn test_query_posts_to_default_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/zins/graphql"))
        .and(body_json(json!({
            "query": "query Traffic($limit: Int) { WEB_TRAFFIC { total(limit: $limit) } }",
            "variables": {"limit": 10}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"WEB_TRAFFIC": {"total": 42}}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(mock_server.uri());
    let zins = ZInsights::new(&client);
    assert_eq!(zins.path(), DEFAULT_GRAPHQL_PATH);

    let data: WebTraffic = zins
        .query(
            "query Traffic($limit: Int) { WEB_TRAFFIC { total(limit: $limit) } }",
            Some(json!({"limit": 10})),
        )
        .await
        .unwrap();
    assert_eq!(data.web_traffic, json!({"total": 42}));
}

#[tokio::test]
async fn test_query_reports_graphql_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/zins/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Field 'nope' is not defined"}]
        })))
        .mount(&mock_server)
        .await;

    let client = client(mock_server.uri());
    let err = ZInsights::new(&client)
        .query::<Value>("{ nope }", None)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "GraphQL error: Field 'nope' is not defined");
}

#[tokio::test]
async fn test_custom_path_and_http_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/custom/graphql"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": "NOT_AUTHORIZED",
            "message": "Z-Insights is not enabled"
        })))
        .mount(&mock_server)
        .await;

    let client = client(mock_server.uri());
    let err = ZInsights::with_path(&client, "/custom/graphql")
        .execute::<Value>(&GraphQlRequest::new("{ ping }"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
}
