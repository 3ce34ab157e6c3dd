//! JSON API over the session and move stores.
//!
//! Thin request/response mapping only: handlers validate the choice string
//! against the configured set, hand everything else to the stores, and
//! translate [`StoreError`] kinds into status codes with FastAPI-style
//! `{"detail": ...}` bodies.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::config::GameConfig;
use crate::db::{Database, MoveStore, Phase, SessionState, SessionStore, StoreError};

/// Shared state handed to every request handler.
#[derive(Clone, Getters)]
pub struct AppState {
    sessions: SessionStore,
    moves: MoveStore,
    database: Database,
    config: GameConfig,
}

impl AppState {
    /// Wires the stores and configuration into request state.
    pub fn new(config: GameConfig) -> Self {
        let database = Database::new(config.database_url().clone());
        let sessions = SessionStore::new(database.clone(), *config.max_players());
        let moves = MoveStore::new(database.clone(), sessions.clone());
        Self {
            sessions,
            moves,
            database,
            config,
        }
    }
}

/// Body returned by `POST /api/join`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    /// Session the player was placed in.
    pub session_id: String,
    /// Opaque token identifying the player within the session.
    pub player_id: String,
}

/// Query string for state and result lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQuery {
    /// Session to interrogate.
    pub session_id: String,
}

/// Body returned by `GET /api/state` and `POST /api/move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    /// Players currently in the session.
    pub players: i64,
    /// Moves recorded so far.
    pub moves: i64,
    /// Derived lifecycle phase.
    pub phase: Phase,
}

impl From<SessionState> for StateResponse {
    fn from(state: SessionState) -> Self {
        Self {
            players: *state.players(),
            moves: *state.moves(),
            phase: *state.phase(),
        }
    }
}

/// Body accepted by `POST /api/move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Session the move belongs to.
    pub session_id: String,
    /// Token handed out at join time.
    pub player_id: String,
    /// The move itself; must be in the configured choice set.
    pub choice: String,
}

/// One recorded move in `GET /api/result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Player token that made the move.
    pub player: String,
    /// Recorded choice.
    pub choice: String,
}

/// Body returned by `GET /api/result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsResponse {
    /// Moves in insertion order.
    pub results: Vec<MoveRecord>,
}

/// Human-readable confirmation body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detail {
    /// Confirmation message.
    pub detail: String,
}

/// Transport-level error: a status code plus a detail body.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::InvalidState { .. } | StoreError::DuplicateMove { .. } => {
                StatusCode::CONFLICT
            }
            StoreError::Contention { .. } | StoreError::Database { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

/// Runs a blocking store operation off the async executor.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::internal(format!("store task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// `POST /api/join` - allocate a session/player tuple.
#[instrument(skip(state))]
async fn join(State(state): State<Arc<AppState>>) -> Result<Json<JoinResponse>, ApiError> {
    let sessions = state.sessions.clone();
    let ticket = run_blocking(move || sessions.join()).await?;
    info!(session_id = %ticket.session_id(), "player joined");
    Ok(Json(JoinResponse {
        session_id: ticket.session_id().clone(),
        player_id: ticket.player_id().clone(),
    }))
}

/// `GET /api/state` - interrogate the session state machine.
#[instrument(skip(state))]
async fn session_state(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<StateResponse>, ApiError> {
    let sessions = state.sessions.clone();
    let snapshot = run_blocking(move || sessions.session_state(&query.session_id)).await?;
    Ok(Json(snapshot.into()))
}

/// `POST /api/move` - persist one move, then return the refreshed state.
#[instrument(skip(state, request), fields(session_id = %request.session_id))]
async fn save_move(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<StateResponse>, ApiError> {
    if !state.config.choices().contains(&request.choice) {
        warn!(choice = %request.choice, "rejected out-of-set choice");
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!(
                "invalid choice '{}'; valid choices: {}",
                request.choice,
                state.config.choices()
            ),
        ));
    }

    let sessions = state.sessions.clone();
    let moves = state.moves.clone();
    let snapshot = run_blocking(move || {
        moves.save_move(&request.session_id, &request.player_id, &request.choice)?;
        sessions.session_state(&request.session_id)
    })
    .await?;
    Ok(Json(snapshot.into()))
}

/// `GET /api/result` - all moves for the session, in insertion order.
#[instrument(skip(state))]
async fn results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ResultsResponse>, ApiError> {
    let moves = state.moves.clone();
    let rows = run_blocking(move || moves.results(&query.session_id)).await?;
    let results = rows
        .iter()
        .map(|row| MoveRecord {
            player: row.player_id().clone(),
            choice: row.choice().clone(),
        })
        .collect();
    Ok(Json(ResultsResponse { results }))
}

/// `GET /api/dataset` - stream the raw SQLite file.
#[instrument(skip(state))]
async fn download_dataset(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let path = state.database.path().to_string();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("failed to read dataset '{}': {}", path, e)))?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"game.db\""),
    ];
    Ok((headers, bytes).into_response())
}

/// `DELETE /api/dataset` - wipe every session and start fresh.
#[instrument(skip(state))]
async fn purge_dataset(State(state): State<Arc<AppState>>) -> Result<Json<Detail>, ApiError> {
    let database = state.database.clone();
    run_blocking(move || {
        database.purge()?;
        database.apply_migrations()
    })
    .await?;
    info!("dataset purged");
    Ok(Json(Detail {
        detail: "database reset; all sessions purged".to_string(),
    }))
}

/// Permissive CORS so a statically-hosted page can call the API from
/// anywhere; preflight requests short-circuit before routing.
async fn cors(request: Request<Body>, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("*"),
    );
    response
}

/// Builds the API router over shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/join", post(join))
        .route("/api/state", get(session_state))
        .route("/api/move", post(save_move))
        .route("/api/result", get(results))
        .route("/api/dataset", get(download_dataset).delete(purge_dataset))
        .layer(middleware::from_fn(cors))
        .with_state(Arc::new(state))
}
