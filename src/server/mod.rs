// src/server/mod.rs

//! HTTP API for the control panel.
//!
//! ## Routes
//!
//! ```text
//! GET  /api/health
//! GET  /api/buildings
//! GET  /api/buildings/tree
//! POST /api/selection/canonicalize   JSON {selection}
//! POST /api/chats/add                JSON {groupme_link, building_id, floor_number}
//! POST /api/auth                     JSON {password}
//! POST /api/messages/send            multipart form
//! ```

mod auth;
mod error;
mod handlers;
mod request_log;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;

use crate::error::{AppError, Result};
use crate::models::{BuildingDirectory, Config};
use crate::services::{
    Broadcaster, ChatOnboarding, ChatRegistry, GroupMeClient, MessagingGateway, SelectionTree,
};

pub use auth::AdminAuth;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<BuildingDirectory>,
    pub tree: Arc<SelectionTree>,
    pub registry: Arc<ChatRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub onboarding: Arc<ChatOnboarding>,
    pub auth: Arc<AdminAuth>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Wire services from explicit collaborators.
    pub fn new(
        config: &Config,
        directory: BuildingDirectory,
        registry: Arc<ChatRegistry>,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Self {
        let directory = Arc::new(directory);
        let broadcaster = Broadcaster::new(
            Arc::clone(&directory),
            Arc::clone(&registry),
            Arc::clone(&gateway),
            &config.broadcast,
            Duration::from_secs(config.groupme.timeout_secs),
        );
        let onboarding = ChatOnboarding::new(Arc::clone(&registry), gateway);

        Self {
            tree: Arc::new(SelectionTree::from_directory(&directory)),
            directory,
            registry,
            broadcaster: Arc::new(broadcaster),
            onboarding: Arc::new(onboarding),
            auth: Arc::new(AdminAuth::new(&config.auth.admin_password)),
            max_upload_bytes: config.server.max_upload_bytes,
        }
    }

    /// Wire services for production: SQLite registry and the GroupMe API.
    pub fn from_config(config: &Config, directory: BuildingDirectory) -> Result<Self> {
        let registry = Arc::new(ChatRegistry::from_config(config));
        let gateway: Arc<dyn MessagingGateway> = Arc::new(GroupMeClient::new(&config.groupme)?);
        Ok(Self::new(config, directory, registry, gateway))
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    let max_upload = state.max_upload_bytes;
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/buildings", get(handlers::list_buildings))
        .route("/api/buildings/tree", get(handlers::selection_tree))
        .route("/api/selection/canonicalize", post(handlers::canonicalize))
        .route("/api/chats/add", post(handlers::add_chat))
        .route("/api/auth", post(handlers::authenticate))
        .route("/api/messages/send", post(handlers::send_message))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(middleware::from_fn(request_log::log_requests))
        .with_state(state)
}

/// Serve the API until Ctrl-C.
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| AppError::config(format!("invalid bind address {bind}: {e}")))?;
    let listener = TcpListener::bind(addr).await?;
    log::info!("Listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::models::sample_directory;
    use crate::services::gateway::fake::RecordingGateway;

    const PASSWORD: &str = "exec-board";
    const BOUNDARY: &str = "rhacbot-test-boundary";

    async fn state_with(gateway: RecordingGateway) -> (AppState, Arc<RecordingGateway>) {
        let mut config = Config::default();
        config.env = "test".into();
        config.auth.admin_password = PASSWORD.into();

        let registry = Arc::new(ChatRegistry::in_memory("test"));
        registry.register("n1", 1, 1).await.unwrap();
        registry.register("n2", 2, 3).await.unwrap();

        let gateway = Arc::new(gateway);
        let state = AppState::new(&config, sample_directory(), registry, gateway.clone());
        (state, gateway)
    }

    async fn call(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_form(fields: &[(&str, &str)], image: Option<&[u8]>) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(bytes) = image {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image_file\"; filename=\"flyer.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/messages/send")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = state_with(RecordingGateway::default()).await;
        let (status, body) = call(state, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "ok",
                "message": "Backend is healthy",
                "env": "test",
                "storage": "memory"
            })
        );
    }

    #[tokio::test]
    async fn test_buildings_and_tree() {
        let (state, _) = state_with(RecordingGateway::default()).await;
        let (status, body) = call(state.clone(), get("/api/buildings")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["buildings"].as_array().unwrap().len(), 6);
        assert_eq!(body["buildings"][0]["region"], "North");

        let (status, body) = call(state, get("/api/buildings/tree")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tree"][0]["value"], "region-all");
        assert_eq!(body["tree"][0]["children"][1]["title"], "South Campus");
    }

    #[tokio::test]
    async fn test_canonicalize_endpoint() {
        let (state, _) = state_with(RecordingGateway::default()).await;
        let (status, body) = call(
            state.clone(),
            post_json(
                "/api/selection/canonicalize",
                json!({"selection": ["3", {"value": "4", "label": "Building D"}, 5]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["selection"],
            json!([
                {"value": "region-South", "label": "South Campus"},
                {"value": "5", "label": "Building E"}
            ])
        );
        assert_eq!(body["targets"]["building_ids"], json!([3, 4, 5]));

        let (status, _) = call(
            state,
            post_json("/api/selection/canonicalize", json!({"selection": [true]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auth_endpoint() {
        let (state, _) = state_with(RecordingGateway::default()).await;

        let (status, _) = call(state.clone(), post_json("/api/auth", json!({"password": PASSWORD}))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(state.clone(), post_json("/api/auth", json!({"password": "nope"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");

        let (status, body) = call(state, post_json("/api/auth", json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing password");
    }

    #[tokio::test]
    async fn test_add_chat_flow() {
        let (state, gateway) = state_with(RecordingGateway::default()).await;
        let request = json!({
            "groupme_link": "https://groupme.com/join_group/12345678/SHARE_TOKEN_ABC",
            "building_id": "12",
            "floor_number": 3
        });

        let (status, body) = call(state.clone(), post_json("/api/chats/add", request.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Chat added successfully");
        assert_eq!(body["chat_id"], body["chat"]["id"]);
        assert_ne!(body["chat_id"], "12345678");
        assert_eq!(body["chat"]["chat_id"], "12345678");
        assert_eq!(body["chat"]["building_id"], 12);
        assert_eq!(body["chat"]["floor_number"], 3);

        let (status, body) = call(state.clone(), post_json("/api/chats/add", request)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Chat already exists");
        assert_eq!(gateway.calls().len(), 1);

        let (status, body) = call(
            state.clone(),
            post_json("/api/chats/add", json!({"groupme_link": "https://invalid-link.com", "building_id": 1, "floor_number": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid GroupMe link");

        let (status, body) = call(state, post_json("/api/chats/add", json!({"building_id": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing groupme_link, building_id, or floor_number");
    }

    #[tokio::test]
    async fn test_add_chat_join_failure_is_bad_gateway() {
        let (state, _) = state_with(RecordingGateway::failing_join()).await;
        let (status, body) = call(
            state,
            post_json(
                "/api/chats/add",
                json!({"groupme_link": "https://groupme.com/join_group/9/T", "building_id": 1, "floor_number": 1}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Failed to join the GroupMe group");
    }

    #[tokio::test]
    async fn test_send_requires_password() {
        let (state, gateway) = state_with(RecordingGateway::default()).await;
        let (status, _) = call(
            state,
            post_form(&[("message_body", "hi"), ("regions", "all")], None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_all_delivered() {
        let (state, gateway) = state_with(RecordingGateway::default()).await;
        let (status, body) = call(
            state,
            post_form(
                &[("auth", PASSWORD), ("message_body", "Floor meeting"), ("regions", "North")],
                Some(b"\x89PNG fake"),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "All messages sent successfully");
        assert_eq!(body["summary"], json!({"total": 2, "sent": 2, "failed": 0}));
        assert_eq!(gateway.sends().len(), 2);
    }

    #[tokio::test]
    async fn test_send_partial_is_multi_status() {
        let (state, _) = state_with(RecordingGateway::failing(&["n2"])).await;
        let (status, body) = call(
            state,
            post_form(
                &[
                    ("password", PASSWORD),
                    ("message_body", "hello"),
                    ("building_ids", "1"),
                    ("building_ids", "2"),
                ],
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::MULTI_STATUS);
        assert_eq!(body["summary"], json!({"total": 2, "sent": 1, "failed": 1}));
        assert_eq!(
            body["failures"],
            json!([{
                "chat_id": "n2",
                "building": "Building B",
                "floor": 3,
                "error": "send to n2 failed",
                "status_code": 500
            }])
        );
    }

    #[tokio::test]
    async fn test_send_total_failure_and_not_found() {
        let (state, _) = state_with(RecordingGateway::failing(&["n1", "n2"])).await;
        let (status, body) = call(
            state.clone(),
            post_form(&[("password", PASSWORD), ("message_body", "hello"), ("regions", "north")], None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body, json!({"error": "No messages were sent", "details": "2 attempts failed"}));

        let (status, _) = call(
            state.clone(),
            post_form(&[("password", PASSWORD), ("message_body", "hello"), ("building_ids", "6")], None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            state,
            post_form(&[("password", PASSWORD), ("message_body", "hello"), ("regions", "East")], None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid region: East");
    }
}
