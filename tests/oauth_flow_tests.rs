use std::time::Duration;

use connector_sdk::models::{ConnectionConfig, ConnectionStatus};
use connector_sdk::{OAuthFlowState, PlatformError};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

mod test_utils;
use test_utils::{API_PREFIX, StubPlatform, client_for};

const REDIRECT_URI: &str = "https://app.example.com/oauth/callback";

#[tokio::test]
async fn flow_moves_pending_connection_to_active() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let connection = client
        .directory()
        .create_connection("gmail", "Inbox", "user-1", &ConnectionConfig::new())
        .await
        .unwrap();
    assert_eq!(connection.status, ConnectionStatus::Pending);

    let mut flow = client.oauth_flow(connection.id.clone());
    let url = flow
        .initiate(client.oauth(), "gmail", REDIRECT_URI)
        .await
        .unwrap()
        .clone();
    assert_eq!(url.scheme(), "https");
    assert!(url.query().unwrap_or_default().contains("state=state-1"));
    assert_eq!(
        flow.state(),
        &OAuthFlowState::Initiated {
            outcome_unknown: false
        }
    );

    let completion = flow
        .complete(client.oauth(), "code-abc", "state-1")
        .await
        .unwrap();
    assert_eq!(completion.connection_id, connection.id);
    assert_eq!(flow.state(), &OAuthFlowState::Active);

    let refreshed = client.directory().get_connection(&connection.id).await.unwrap();
    assert_eq!(refreshed.status, ConnectionStatus::Active);
}

#[tokio::test]
async fn replayed_code_fails_without_demoting_active_connection() {
    let platform = StubPlatform::start().await;
    let client = platform.client();
    let oauth = client.oauth();

    let connection = client
        .directory()
        .create_connection("dropbox", "Files", "user-1", &ConnectionConfig::new())
        .await
        .unwrap();

    let session = oauth
        .initiate_oauth("dropbox", REDIRECT_URI, Some(&connection.id))
        .await
        .unwrap();
    assert_eq!(session.connection_id.as_deref(), Some(connection.id.as_str()));

    oauth
        .complete_oauth(&connection.id, "code-1", REDIRECT_URI)
        .await
        .unwrap();
    assert_eq!(platform.status_of(&connection.id).as_deref(), Some("active"));

    let err = oauth
        .complete_oauth(&connection.id, "code-1", REDIRECT_URI)
        .await
        .unwrap_err();
    match err {
        PlatformError::OAuthCompletion {
            message,
            status_code,
        } => {
            assert!(message.contains("invalid_grant"));
            assert_eq!(status_code, Some(400));
        }
        other => panic!("expected OAuth completion error, got {:?}", other),
    }
    assert_eq!(platform.status_of(&connection.id).as_deref(), Some("active"));
}

#[tokio::test]
async fn rejected_code_marks_pending_connection_as_error() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let first = client
        .directory()
        .create_connection("onedrive", "Drive A", "user-1", &ConnectionConfig::new())
        .await
        .unwrap();
    let second = client
        .directory()
        .create_connection("onedrive", "Drive B", "user-1", &ConnectionConfig::new())
        .await
        .unwrap();

    client
        .oauth()
        .complete_oauth(&first.id, "shared-code", REDIRECT_URI)
        .await
        .unwrap();

    let mut flow = client.oauth_flow(second.id.clone());
    flow.initiate(client.oauth(), "onedrive", REDIRECT_URI)
        .await
        .unwrap();
    let err = flow
        .complete(client.oauth(), "shared-code", "state-1")
        .await
        .unwrap_err();

    assert!(matches!(err, PlatformError::OAuthCompletion { .. }));
    assert!(matches!(flow.state(), OAuthFlowState::Failed { .. }));
    assert_eq!(platform.status_of(&second.id).as_deref(), Some("error"));

    // A failed flow may start over.
    flow.initiate(client.oauth(), "onedrive", REDIRECT_URI)
        .await
        .unwrap();
    flow.complete(client.oauth(), "fresh-code", "state-2")
        .await
        .unwrap();
    assert_eq!(platform.status_of(&second.id).as_deref(), Some("active"));
}

#[tokio::test]
async fn state_mismatch_is_rejected_before_exchange() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let connection = client
        .directory()
        .create_connection("gmail", "Inbox", "user-1", &ConnectionConfig::new())
        .await
        .unwrap();

    let mut flow = client.oauth_flow(connection.id.clone());
    flow.initiate(client.oauth(), "gmail", REDIRECT_URI)
        .await
        .unwrap();
    let err = flow
        .complete(client.oauth(), "code-1", "forged-state")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlatformError::OAuthCompletion {
            status_code: None,
            ..
        }
    ));
    assert_eq!(platform.status_of(&connection.id).as_deref(), Some("pending"));
    assert!(platform.state.lock().unwrap().used_codes.is_empty());
}

#[tokio::test]
async fn session_cannot_complete_a_different_connection() {
    let platform = StubPlatform::start().await;
    let client = platform.client();
    let directory = client.directory();

    let first = directory
        .create_connection("gmail", "Inbox A", "user-1", &ConnectionConfig::new())
        .await
        .unwrap();
    let second = directory
        .create_connection("gmail", "Inbox B", "user-1", &ConnectionConfig::new())
        .await
        .unwrap();

    let session = client
        .oauth()
        .initiate_oauth("gmail", REDIRECT_URI, Some(&first.id))
        .await
        .unwrap();
    let state = session.state.clone();

    let err = client
        .oauth()
        .complete_session(session, &second.id, "code-1", &state)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PlatformError::OAuthCompletion {
            status_code: None,
            ..
        }
    ));
    assert_eq!(platform.status_of(&first.id).as_deref(), Some("pending"));
    assert_eq!(platform.status_of(&second.id).as_deref(), Some("pending"));
    assert!(platform.state.lock().unwrap().used_codes.is_empty());
}

#[tokio::test]
async fn flow_cannot_complete_before_initiation() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let mut flow = client.oauth_flow("conn-1");
    let err = flow
        .complete(client.oauth(), "code", "state")
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::OAuthCompletion { .. }));
    assert_eq!(flow.state(), &OAuthFlowState::Unauthorized);
}

#[tokio::test]
async fn unknown_connector_type_fails_initiation() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let err = client
        .oauth()
        .initiate_oauth("fax", REDIRECT_URI, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlatformError::OAuthInit {
            status_code: Some(404),
            ..
        }
    ));
}

#[tokio::test]
async fn relative_redirect_uri_is_rejected_locally() {
    let platform = StubPlatform::start().await;
    let client = platform.client();

    let err = client
        .oauth()
        .initiate_oauth("gmail", "/callback", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlatformError::OAuthInit {
            status_code: None,
            ..
        }
    ));
    assert!(platform.state.lock().unwrap().issued_states.is_empty());
}

#[tokio::test]
async fn timed_out_completion_leaves_outcome_unknown_until_reconciled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}/oauth/authorize", API_PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorization_url": "https://accounts.example.com/auth?state=s-1",
            "state": "s-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("{}/oauth/callback", API_PREFIX)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "OAuth completed successfully"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/connections/conn-1", API_PREFIX)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "conn-1",
            "connector_type": "gmail",
            "name": "Inbox",
            "user_id": "user-1",
            "status": "active"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Duration::from_millis(200));
    let mut flow = client.oauth_flow("conn-1");
    flow.initiate(client.oauth(), "gmail", REDIRECT_URI)
        .await
        .unwrap();

    let err = flow
        .complete(client.oauth(), "code-1", "s-1")
        .await
        .unwrap_err();
    assert!(err.is_indeterminate());
    assert_eq!(
        flow.state(),
        &OAuthFlowState::Initiated {
            outcome_unknown: true
        }
    );

    let connection = client.directory().get_connection("conn-1").await.unwrap();
    flow.reconcile(&connection.status);
    assert_eq!(flow.state(), &OAuthFlowState::Active);
}
