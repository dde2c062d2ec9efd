//! Control routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use skiff_agent::{AgentLifecycleManager, DispatchMode};

use crate::WebError;

/// Shared state for the control server.
pub struct AppState {
    pub manager: Arc<AgentLifecycleManager>,
}

/// Create the control router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/agent", post(start_agent))
        .route("/agent", get(agent_status))
        .route("/health", get(health))
        .with_state(state)
}

/// Request body for starting (or replacing) the agent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAgentRequest {
    pub workspace_name: String,
    pub preshared_key_hex: String,
    pub channel_name: String,
    #[serde(default = "default_mode")]
    pub mode: DispatchMode,
}

fn default_mode() -> DispatchMode {
    DispatchMode::AiReply
}

/// Start a new agent, replacing any currently running one.
async fn start_agent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartAgentRequest>,
) -> impl IntoResponse {
    info!(
        workspace = %request.workspace_name,
        channel = %request.channel_name,
        "received agent start request"
    );

    match state
        .manager
        .start_or_replace(
            &request.workspace_name,
            &request.preshared_key_hex,
            &request.channel_name,
            request.mode,
        )
        .await
    {
        Ok(status) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "message": format!(
                    "agent running on {}#{}",
                    status.workspace_name, status.channel_name
                ),
            })),
        ),
        Err(e) => {
            warn!(error = %e, "agent start failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "ok": false,
                    "error": e.to_string(),
                })),
            )
        }
    }
}

/// Report the currently running agent, if any.
async fn agent_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let agent = state.manager.status().await;
    Json(json!({
        "ok": true,
        "agent": agent,
    }))
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Run the control server on the specified port.
pub async fn run_server(manager: Arc<AgentLifecycleManager>, port: u16) -> Result<(), WebError> {
    let state = Arc::new(AppState { manager });
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("control server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
