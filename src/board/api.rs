use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::broadcast;

use super::models::{
    DEFAULT_REPORTER, IssueDraft, IssuePatch, IssueStatus, IssueType, Priority,
};
use super::repository::IssueRepository;
use super::views::{DEFAULT_RECENT, Filter, IssueQuery};
use super::ws::{WsMessage, broadcast_message};
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub repo: Arc<IssueRepository>,
    pub ws_tx: broadcast::Sender<String>,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl ListParams {
    pub fn into_query(self) -> Result<IssueQuery, String> {
        let status = match self.status.as_deref() {
            Some(s) => s.parse::<Filter<IssueStatus>>()?,
            None => Filter::All,
        };
        let priority = match self.priority.as_deref() {
            Some(p) => p.parse::<Filter<Priority>>()?,
            None => Filter::All,
        };
        Ok(IssueQuery {
            search: self.search.unwrap_or_default(),
            status,
            priority,
        })
    }
}

#[derive(Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub status: Option<IssueStatus>,
    pub priority: Option<Priority>,
    #[serde(rename = "type")]
    pub kind: Option<IssueType>,
    pub reporter: Option<String>,
    pub estimate: Option<f64>,
}

impl From<CreateIssueRequest> for IssueDraft {
    fn from(req: CreateIssueRequest) -> Self {
        let mut draft = IssueDraft::new(req.title, req.description, req.assignee);
        if let Some(status) = req.status {
            draft.status = status;
        }
        if let Some(priority) = req.priority {
            draft.priority = priority;
        }
        if let Some(kind) = req.kind {
            draft.kind = kind;
        }
        draft.reporter = req.reporter.unwrap_or_else(|| DEFAULT_REPORTER.to_string());
        draft.estimate = req.estimate;
        draft
    }
}

#[derive(Deserialize)]
pub struct DashboardParams {
    pub recent: Option<usize>,
}

// ── Error handling ────────────────────────────────────────────────────

pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    BadGateway(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        let msg = err.to_string();
        match err {
            BoardError::Validation(_) => ApiError::BadRequest(msg),
            BoardError::IssueNotFound { .. } => ApiError::NotFound(msg),
            BoardError::SessionClosed => ApiError::Unavailable(msg),
            BoardError::Fetch(_) | BoardError::Mutation { .. } => ApiError::BadGateway(msg),
        }
    }
}

/// Malformed bodies and query strings get the same JSON error shape as
/// validation failures.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/issues", get(list_issues).post(create_issue))
        .route("/api/issues/refresh", post(refresh_issues))
        .route(
            "/api/issues/{id}",
            get(get_issue).patch(update_issue).delete(delete_issue),
        )
        .route("/api/board", get(get_board))
        .route("/api/dashboard", get(get_dashboard))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_issues(
    State(state): State<SharedState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let query = params.into_query().map_err(ApiError::BadRequest)?;
    Ok(Json(state.repo.query(&query)))
}

async fn refresh_issues(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let report = state.repo.load().await?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::IssuesLoaded {
            loaded: report.loaded,
            rejected: report.rejected,
        },
    );
    Ok(Json(report))
}

async fn create_issue(
    State(state): State<SharedState>,
    payload: Result<Json<CreateIssueRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let issue = state.repo.create(req.into()).await?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::IssueCreated {
            issue: issue.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn get_issue(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.repo.get(&id) {
        Some(issue) => Ok(Json(issue)),
        None => Err(ApiError::NotFound(format!("Issue {} not found", id))),
    }
}

async fn update_issue(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Json<IssuePatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(patch) = payload?;
    let issue = state.repo.update(&id, patch).await?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::IssueUpdated {
            issue: issue.clone(),
        },
    );
    Ok(Json(issue))
}

async fn delete_issue(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.repo.delete(&id).await?;
    broadcast_message(&state.ws_tx, &WsMessage::IssueDeleted { issue_id: id });
    Ok(StatusCode::NO_CONTENT)
}

async fn get_board(State(state): State<SharedState>) -> impl IntoResponse {
    Json(state.repo.board())
}

async fn get_dashboard(
    State(state): State<SharedState>,
    params: Result<Query<DashboardParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    Ok(Json(
        state.repo.dashboard(params.recent.unwrap_or(DEFAULT_RECENT)),
    ))
}
