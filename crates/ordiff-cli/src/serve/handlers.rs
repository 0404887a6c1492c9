//! HTTP route handlers.
//!
//! Handlers are kept thin, delegating to `ordiff-core`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use ordiff_core::{
    compare, CompareError, CompareReport, DeltaStore, Release, RepoSettings, RunStatus, SummaryData,
};

use super::models::{CompareQuery, ErrorResponse, IndexRequest, IndexStarted};
use super::AppState;

// =============================================================================
// Errors
// =============================================================================

/// An error rendered as `{"error": "..."}` with a status code.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

impl From<CompareError> for ApiError {
    fn from(e: CompareError) -> Self {
        let status = match e {
            CompareError::ReleaseNotFound { .. } => StatusCode::NOT_FOUND,
            CompareError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

// =============================================================================
// Indexing
// =============================================================================

/// POST `/api/index` - Start indexing a repository in the background.
///
/// Returns 202 when accepted, 409 while another run is active and 400 when
/// `owner` or `repo` is missing.
pub async fn start_index(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IndexRequest>,
) -> Result<(StatusCode, Json<IndexStarted>), ApiError> {
    let (owner, repo) = request
        .validate()
        .map_err(|msg| ApiError::new(StatusCode::BAD_REQUEST, msg))?;

    state
        .service
        .start_indexing(&owner, &repo)
        .map_err(|e| ApiError::new(StatusCode::CONFLICT, e.to_string()))?;

    let message = format!("Started indexing {owner}/{repo}. Poll /api/index/status for progress.");
    Ok((
        StatusCode::ACCEPTED,
        Json(IndexStarted {
            status: "started",
            owner,
            repo,
            message,
        }),
    ))
}

/// GET `/api/index/status` - Latest indexing run status.
pub async fn index_status(State(state): State<Arc<AppState>>) -> Json<RunStatus> {
    Json(state.service.poll_status())
}

// =============================================================================
// Queries
// =============================================================================

/// GET `/api/releases` - Cached releases of the default repository, newest first.
pub async fn list_releases(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Release>>, ApiError> {
    let (owner, repo) = default_repo(&state)?;
    let releases = state
        .store
        .get_releases(&owner, &repo)
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(releases))
}

/// GET `/api/compare?from=&to=` - Full comparison between two releases.
pub async fn compare_releases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<CompareReport>, ApiError> {
    let (owner, repo) = default_repo(&state)?;
    let report = compare(&*state.store, &owner, &repo, &query.from, &query.to)?;
    Ok(Json(report))
}

/// GET `/api/summary?from=&to=` - Condensed comparison: counts, top 10 files
/// and the first 20 commits.
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompareQuery>,
) -> Result<Json<SummaryData>, ApiError> {
    let (owner, repo) = default_repo(&state)?;
    let report = compare(&*state.store, &owner, &repo, &query.from, &query.to)?;
    Ok(Json(report.summary()))
}

fn default_repo(state: &AppState) -> Result<(String, String), ApiError> {
    let settings = RepoSettings::load(&state.settings_path).unwrap_or_else(|e| {
        warn!(error = %e, "Could not read settings");
        RepoSettings::default()
    });

    settings
        .default_repo()
        .map(|(owner, repo)| (owner.to_string(), repo.to_string()))
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                "No default repository. POST /api/index with owner and repo first.",
            )
        })
}
