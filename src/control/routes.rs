// HTTP control surface for spawning and tracking AI players

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::Registry;
use crate::ai::PolicyService;
use crate::config::ClientConfig;
use crate::network::{GameClient, PaddleSide};

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub policies: Arc<PolicyService>,
    pub client: Arc<ClientConfig>,
}

impl AppState {
    pub fn new(policies: PolicyService, client: ClientConfig) -> Self {
        Self {
            registry: Registry::new(),
            policies: Arc::new(policies),
            client: Arc::new(client),
        }
    }
}

/// Error response: `{"detail": "..."}` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    fn unavailable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, detail = %self.detail, "request failed");
        (self.status, Json(serde_json::json!({"detail": self.detail}))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinGameRequest {
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Success,
    AlreadyPlaying,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct JoinGameResponse {
    pub status: JoinStatus,
    pub session_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paddle: Option<PaddleSide>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_loaded: bool,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ActiveGamesResponse {
    pub active_sessions: Vec<String>,
    pub count: usize,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct StopGameResponse {
    pub status: &'static str,
    pub session_id: String,
}

/// Build the control router. `GET /health` also answers `HEAD`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/join-game", post(join_game))
        .route("/health", get(health))
        .route("/active-games", get(list_active_games))
        .route("/active-games/:session_id", delete(stop_game))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

fn not_ready_detail(policies: &PolicyService) -> String {
    policies
        .load_error()
        .unwrap_or("AI model not loaded")
        .to_string()
}

/// Spawn an AI player for a game session
pub async fn join_game(
    State(state): State<AppState>,
    Json(request): Json<JoinGameRequest>,
) -> Result<Json<JoinGameResponse>, ApiError> {
    if !state.policies.is_ready() {
        return Err(ApiError::unavailable(not_ready_detail(&state.policies)));
    }

    let session_id = request
        .session_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("sessionId is required"))?;
    info!(%session_id, "🎮 AI join request");

    let policy = state
        .policies
        .create_policy(&state.client)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let client = GameClient::new(&state.client, policy).map_err(|e| ApiError::internal(e.to_string()))?;

    let Some(generation) = state.registry.try_insert(&session_id, client.stop_handle()).await else {
        info!(%session_id, "AI already playing in session");
        return Ok(Json(JoinGameResponse {
            status: JoinStatus::AlreadyPlaying,
            session_id,
            message: "AI is already in this game".to_string(),
            paddle: None,
        }));
    };

    let registry = state.registry.clone();
    let task_session = session_id.clone();
    tokio::spawn(async move {
        let mut client = client;
        let outcome = client.play(&task_session).await;
        info!(session_id = %task_session, ?outcome, "AI session ended");
        registry.remove(&task_session, generation).await;
    });
    info!(%session_id, "AI player task started");

    Ok(Json(JoinGameResponse {
        status: JoinStatus::Success,
        session_id,
        message: "AI player joined the game".to_string(),
        paddle: Some(state.client.paddle),
    }))
}

/// Readiness of the loaded policy
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if !state.policies.is_ready() {
        return Err(ApiError::unavailable(not_ready_detail(&state.policies)));
    }
    Ok(Json(HealthResponse {
        status: "healthy",
        model_loaded: true,
    }))
}

/// Sessions with a running AI player
pub async fn list_active_games(State(state): State<AppState>) -> Json<ActiveGamesResponse> {
    let active_sessions = state.registry.session_ids().await;
    Json(ActiveGamesResponse {
        count: active_sessions.len(),
        active_sessions,
    })
}

/// Ask the AI player of a session to leave
pub async fn stop_game(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StopGameResponse>, ApiError> {
    if !state.registry.stop(&session_id).await {
        return Err(ApiError::not_found(format!("No AI player in session {}", session_id)));
    }
    info!(%session_id, "Stopping AI player");
    Ok(Json(StopGameResponse {
        status: "stopping",
        session_id,
    }))
}
