//! Test utilities: an in-memory connector platform served by wiremock.
//!
//! The stub keeps connections and consumed authorization codes in shared
//! state so multi-step flows (create, authorize, complete, replay) behave like
//! the real platform.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use connector_sdk::{PlatformClient, SdkConfig};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, Request, Respond, ResponseTemplate,
    matchers::{method, path, path_regex},
};

pub const API_PREFIX: &str = "/api/v1";

/// Connector types known to the stub: (name, auth type).
const CONNECTOR_TYPES: &[(&str, &str)] = &[
    ("gmail", "oauth2"),
    ("dropbox", "oauth2"),
    ("onedrive", "oauth2"),
    ("webhook", "api_key"),
];

#[derive(Default)]
pub struct PlatformState {
    pub connections: HashMap<String, Value>,
    pub used_codes: HashSet<String>,
    pub issued_states: Vec<String>,
    next_id: u64,
}

impl PlatformState {
    pub fn status_of(&self, connection_id: &str) -> Option<String> {
        self.connections
            .get(connection_id)
            .and_then(|c| c["status"].as_str())
            .map(str::to_string)
    }
}

#[derive(Clone, Copy)]
enum Route {
    ListConnectors,
    CreateConnection,
    GetConnection,
    DeleteConnection,
    Authorize,
    Callback,
}

struct StubResponder {
    route: Route,
    state: Arc<Mutex<PlatformState>>,
}

impl Respond for StubResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut state = self.state.lock().unwrap();
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let last_segment = request
            .url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        match self.route {
            Route::ListConnectors => {
                let connectors: Vec<Value> = CONNECTOR_TYPES
                    .iter()
                    .map(|(name, auth)| {
                        json!({
                            "name": name,
                            "display_name": name.to_uppercase(),
                            "description": format!("{} connector", name),
                            "auth_type": auth,
                            "version": "1.0.0"
                        })
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(connectors)
            }
            Route::CreateConnection => create_connection(&mut state, &body),
            Route::GetConnection => match state.connections.get(&last_segment) {
                Some(connection) => ResponseTemplate::new(200).set_body_json(connection.clone()),
                None => not_found("Connection not found"),
            },
            Route::DeleteConnection => match state.connections.remove(&last_segment) {
                Some(_) => ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "Connection deleted successfully"})),
                None => not_found("Connection not found"),
            },
            Route::Authorize => {
                let connector_type = body["connector_type"].as_str().unwrap_or_default();
                if !CONNECTOR_TYPES.iter().any(|(name, _)| *name == connector_type) {
                    return not_found(&format!("Connector '{}' not found", connector_type));
                }
                let oauth_state = format!("state-{}", state.issued_states.len() + 1);
                state.issued_states.push(oauth_state.clone());
                ResponseTemplate::new(200).set_body_json(json!({
                    "authorization_url": format!(
                        "https://accounts.example.com/o/oauth2/auth?client_id=stub&state={}",
                        oauth_state
                    ),
                    "state": oauth_state
                }))
            }
            Route::Callback => complete_oauth(&mut state, &body),
        }
    }
}

fn not_found(detail: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({ "detail": detail }))
}

fn create_connection(state: &mut PlatformState, body: &Value) -> ResponseTemplate {
    let connector_type = body["connector_type"].as_str().unwrap_or_default();
    let Some((_, auth_type)) = CONNECTOR_TYPES
        .iter()
        .find(|(name, _)| *name == connector_type)
    else {
        return not_found(&format!("Connector '{}' not found", connector_type));
    };

    if connector_type == "webhook" && body["config"].get("url").is_none() {
        return ResponseTemplate::new(400)
            .set_body_json(json!({"detail": "Missing required field: url"}));
    }

    state.next_id += 1;
    let id = format!("conn-{}", state.next_id);
    let status = if *auth_type == "oauth2" {
        "pending"
    } else {
        "active"
    };
    let connection = json!({
        "id": id,
        "connector_type": connector_type,
        "name": body["name"],
        "user_id": body["user_id"],
        "status": status,
        "config": body["config"],
        "created_at": "2024-05-01T10:00:00.123456"
    });
    state.connections.insert(id, connection.clone());
    ResponseTemplate::new(200).set_body_json(connection)
}

fn complete_oauth(state: &mut PlatformState, body: &Value) -> ResponseTemplate {
    let connection_id = body["connection_id"].as_str().unwrap_or_default().to_string();
    let code = body["code"].as_str().unwrap_or_default().to_string();

    let Some(connection) = state.connections.get(&connection_id).cloned() else {
        return not_found("Connection not found");
    };

    if !state.used_codes.insert(code) {
        // Failed exchanges flag the connection, but never demote an active one.
        if connection["status"] != "active"
            && let Some(stored) = state.connections.get_mut(&connection_id)
        {
            stored["status"] = json!("error");
        }
        return ResponseTemplate::new(400)
            .set_body_json(json!({"detail": "invalid_grant: authorization code already used"}));
    }

    if let Some(stored) = state.connections.get_mut(&connection_id) {
        stored["status"] = json!("active");
    }
    ResponseTemplate::new(200).set_body_json(json!({
        "message": "OAuth completed successfully",
        "connection_id": connection_id
    }))
}

/// A running stub platform plus a client pointed at it.
pub struct StubPlatform {
    pub server: MockServer,
    pub state: Arc<Mutex<PlatformState>>,
}

impl StubPlatform {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let state = Arc::new(Mutex::new(PlatformState::default()));

        let routes = [
            ("GET", format!("^{}/connectors$", API_PREFIX), Route::ListConnectors),
            ("POST", format!("^{}/connections$", API_PREFIX), Route::CreateConnection),
            ("GET", format!("^{}/connections/[^/]+$", API_PREFIX), Route::GetConnection),
            ("DELETE", format!("^{}/connections/[^/]+$", API_PREFIX), Route::DeleteConnection),
            ("POST", format!("^{}/oauth/authorize$", API_PREFIX), Route::Authorize),
            ("POST", format!("^{}/oauth/callback$", API_PREFIX), Route::Callback),
        ];

        for (http_method, pattern, route) in routes {
            Mock::given(method(http_method))
                .and(path_regex(pattern))
                .respond_with(StubResponder {
                    route,
                    state: state.clone(),
                })
                .mount(&server)
                .await;
        }

        Self { server, state }
    }

    pub fn client(&self) -> PlatformClient {
        client_for(&self.server.uri(), Duration::from_secs(5))
    }

    pub fn status_of(&self, connection_id: &str) -> Option<String> {
        self.state.lock().unwrap().status_of(connection_id)
    }
}

pub fn client_for(base_url: &str, timeout: Duration) -> PlatformClient {
    let config = SdkConfig::for_base_url(base_url).with_request_timeout(timeout);
    PlatformClient::new(config).expect("stub config is valid")
}

/// Mount a fixed `/proxy/execute` response on `server`.
pub async fn mount_proxy_response(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("{}/proxy/execute", API_PREFIX)))
        .respond_with(response)
        .mount(server)
        .await;
}
