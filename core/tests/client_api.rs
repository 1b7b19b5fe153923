//! HTTP-level tests for the request executor and pagination pass-through,
//! against a local mock of the Websets API.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use websets_core::endpoint::{resolve, routes};
use websets_core::{ClientConfig, CoreError, Page, PageRequest, Query, WebsetsClient};

fn test_client(base_url: &str) -> WebsetsClient {
    WebsetsClient::new(ClientConfig {
        base_url: base_url.to_string(),
        api_key: "test-api-key".to_string(),
        timeout: Duration::from_secs(5),
    })
}

#[tokio::test]
async fn get_sends_credential_and_decodes_json() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/websets/ws_01"))
        .and(header("x-api-key", "test-api-key"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "ws_01",
            "status": "idle"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let path = resolve(routes::WEBSET_BY_ID, &[("websetId", "ws_01")]).unwrap();
    let body = client.get(&path, &Query::new()).await.unwrap();
    assert_eq!(body["id"], "ws_01");
    assert_eq!(body["status"], "idle");
}

#[tokio::test]
async fn remote_404_surfaces_status_and_remote_message() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/websets/ws_01/items/item_missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"error": "Item not found"})),
        )
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let path = resolve(
        routes::WEBSET_ITEM_BY_ID,
        &[("websetId", "ws_01"), ("itemId", "item_missing")],
    )
    .unwrap();
    let err = client.get(&path, &Query::new()).await.unwrap_err();
    match err {
        CoreError::RemoteApi {
            status,
            message,
            body,
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Item not found");
            assert_eq!(body["error"], "Item not found");
        }
        other => panic!("expected RemoteApi, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_error_body_is_kept_verbatim() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/websets"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = client.get(routes::WEBSETS, &Query::new()).await.unwrap_err();
    match err {
        CoreError::RemoteApi {
            status,
            message,
            body,
        } => {
            assert_eq!(status, 502);
            assert_eq!(message, "HTTP 502");
            assert_eq!(body, json!("bad gateway"));
        }
        other => panic!("expected RemoteApi, got {other:?}"),
    }
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    // Port 9 is discard; nothing listens there.
    let client = test_client("http://127.0.0.1:9");
    let err = client.get(routes::WEBSETS, &Query::new()).await.unwrap_err();
    assert!(matches!(err, CoreError::Transport(_)));
}

#[tokio::test]
async fn limited_listing_surfaces_page_and_cursor() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/websets/ws_01/items"))
        .and(query_param("limit", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "item_1"},
                {"id": "item_2"},
                {"id": "item_3"}
            ],
            "hasMore": true,
            "nextCursor": "cursor_page_2"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let path = resolve(routes::WEBSET_ITEMS, &[("websetId", "ws_01")]).unwrap();
    let mut query = Query::new();
    PageRequest {
        cursor: None,
        limit: Some(3),
    }
    .apply(&mut query);

    let body = client.get(&path, &query).await.unwrap();
    let page = Page::from_response(&body);
    assert_eq!(page.items.len(), 3);
    assert!(page.has_more);
    let cursor = page.next_cursor.expect("cursor must exist when hasMore");
    assert!(!cursor.is_empty());
    assert_eq!(cursor, "cursor_page_2");
}

#[tokio::test]
async fn final_page_has_no_cursor() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/websets/ws_01/items"))
        .and(query_param("cursor", "cursor_page_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "item_4"}],
            "hasMore": false
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let path = resolve(routes::WEBSET_ITEMS, &[("websetId", "ws_01")]).unwrap();
    let mut query = Query::new();
    PageRequest {
        cursor: Some("cursor_page_2".to_string()),
        limit: None,
    }
    .apply(&mut query);

    let body = client.get(&path, &query).await.unwrap();
    let page = Page::from_response(&body);
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn empty_delete_response_decodes_to_null() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/websets/ws_01/items/item_1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let path = resolve(
        routes::WEBSET_ITEM_BY_ID,
        &[("websetId", "ws_01"), ("itemId", "item_1")],
    )
    .unwrap();
    let body = client.delete(&path).await.unwrap();
    assert!(body.is_null());
}
