use connector_sdk::PlatformError;
use connector_sdk::models::{ConnectionConfig, ConnectionStatus, DeleteOutcome, HttpMethod};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

mod test_utils;
use test_utils::{API_PREFIX, StubPlatform, client_for};

#[tokio::test]
async fn create_then_get_returns_matching_connection() {
    let platform = StubPlatform::start().await;
    let client = platform.client();
    let directory = client.directory();

    for connector_type in ["gmail", "dropbox", "onedrive"] {
        let config = ConnectionConfig::new().insert("scopes", json!(["read"]));
        let created = directory
            .create_connection(connector_type, "Work account", "user-42", &config)
            .await
            .expect("create succeeds");
        assert_eq!(created.status, ConnectionStatus::Pending);

        let fetched = directory.get_connection(&created.id).await.expect("get succeeds");
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.connector_type, connector_type);
        assert_eq!(fetched.name, "Work account");
        assert_eq!(fetched.user_id, "user-42");
        assert_eq!(fetched.config.get("scopes"), Some(&json!(["read"])));
        assert!(fetched.created_at.is_some(), "naive timestamps are accepted");
    }
}

#[tokio::test]
async fn connection_without_oauth_starts_active() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let config = ConnectionConfig::new().insert("url", "https://hooks.example.com/in");
    let connection = client
        .directory()
        .create_connection("webhook", "Inbound", "user-1", &config)
        .await
        .unwrap();
    assert_eq!(connection.status, ConnectionStatus::Active);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let platform = StubPlatform::start().await;
    let client = platform.client();
    let directory = client.directory();

    let connection = directory
        .create_connection("gmail", "Mail", "user-1", &ConnectionConfig::new())
        .await
        .unwrap();

    let first = directory.delete_connection(&connection.id).await.unwrap();
    let second = directory.delete_connection(&connection.id).await.unwrap();
    assert_eq!(first, DeleteOutcome::Deleted);
    assert_eq!(second, DeleteOutcome::AlreadyGone);

    let err = directory.get_connection(&connection.id).await.unwrap_err();
    assert!(matches!(err, PlatformError::NotFound { resource: "connection", .. }));
}

#[tokio::test]
async fn unknown_connector_type_is_reported_verbatim() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let err = client
        .directory()
        .create_connection("fax", "Fax", "user-1", &ConnectionConfig::new())
        .await
        .unwrap_err();

    match err {
        PlatformError::UnknownConnectorType { message } => {
            assert_eq!(message, "Connector 'fax' not found");
        }
        other => panic!("expected unknown connector type, got {:?}", other),
    }
}

#[tokio::test]
async fn rejected_config_maps_to_invalid_config() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let err = client
        .directory()
        .create_connection("webhook", "Inbound", "user-1", &ConnectionConfig::new())
        .await
        .unwrap_err();

    match err {
        PlatformError::InvalidConfig { message } => {
            assert!(message.contains("url"));
        }
        other => panic!("expected invalid config, got {:?}", other),
    }
}

#[tokio::test]
async fn list_connector_types_keeps_platform_order() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let types = client.directory().list_connector_types().await.unwrap();
    let names: Vec<&str> = types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["gmail", "dropbox", "onedrive", "webhook"]);
    assert!(types[0].requires_oauth());
    assert!(!types[3].requires_oauth());
}

#[tokio::test]
async fn revoked_connection_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/connections/conn-9", API_PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "conn-9",
            "connector_type": "gmail",
            "name": "Old",
            "user_id": "user-1",
            "status": "revoked",
            "config": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), std::time::Duration::from_secs(5));
    let err = client.directory().get_connection("conn-9").await.unwrap_err();
    assert!(matches!(err, PlatformError::NotFound { .. }));
}

#[tokio::test]
async fn list_connections_sends_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/connections", API_PREFIX)))
        .and(query_param("user_id", "user-1"))
        .and(query_param("connector_type", "dropbox"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "conn-1",
                "connector_type": "dropbox",
                "name": "Files",
                "status": "active",
                "created_at": "2024-05-01T10:00:00+00:00"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), std::time::Duration::from_secs(5));
    let connections = client
        .directory()
        .list_connections("user-1", Some("dropbox"))
        .await
        .unwrap();
    assert_eq!(connections.len(), 1);
    assert!(connections[0].status.is_usable());
}

#[tokio::test]
async fn delete_rejection_carries_platform_text() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/connections/conn-1", API_PREFIX)))
        .respond_with(ResponseTemplate::new(409).set_body_string("connection has running jobs"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), std::time::Duration::from_secs(5));
    let err = client.directory().delete_connection("conn-1").await.unwrap_err();
    match err {
        PlatformError::DeleteFailed {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 409);
            assert_eq!(message, "connection has running jobs");
        }
        other => panic!("expected delete failure, got {:?}", other),
    }
}

#[tokio::test]
async fn every_request_carries_a_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/connectors", API_PREFIX)))
        .and(wiremock::matchers::header_exists("x-request-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), std::time::Duration::from_secs(5));
    let types = client.directory().list_connector_types().await.unwrap();
    assert!(types.is_empty());
}

#[tokio::test]
async fn connector_detail_and_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/connectors/gmail", API_PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "gmail",
            "display_name": "Gmail",
            "auth": {
                "type": "oauth2",
                "scopes": ["https://www.googleapis.com/auth/gmail.modify"]
            },
            "endpoints": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/connectors/gmail/endpoints", API_PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "name": "list_messages",
                "method": "GET",
                "path": "/gmail/v1/users/me/messages",
                "parameters": [
                    {"name": "maxResults", "location": "query", "required": false}
                ]
            },
            {
                "name": "get_message",
                "method": "get",
                "path": "/gmail/v1/users/me/messages/{messageId}"
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/connectors/fax", API_PREFIX)))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"detail": "Connector 'fax' not found"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), std::time::Duration::from_secs(5));
    let directory = client.directory();

    let descriptor = directory.get_connector_type("gmail").await.unwrap();
    assert_eq!(descriptor.label(), "Gmail");
    assert!(descriptor.requires_oauth());

    let endpoints = directory.list_connector_endpoints("gmail").await.unwrap();
    assert_eq!(endpoints.len(), 2);
    assert_eq!(endpoints[1].path_placeholders(), vec!["messageId"]);
    assert_eq!(endpoints[1].method, HttpMethod::Get);

    let err = directory.get_connector_type("fax").await.unwrap_err();
    assert!(matches!(err, PlatformError::UnknownConnectorType { .. }));
}
