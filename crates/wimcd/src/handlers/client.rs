//! Client-surface handlers: fetch/update/cancel submission and status.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use wimc_core::contracts::FetchEnvelope;
use wimc_core::job::{JobSnapshot, RequestType};

use crate::error::HttpError;
use crate::state::AppState;

/// Handle a wimc request envelope.
///
/// Fetch acceptance answers 202 with an empty body; update/cancel answer
/// 200. Validation failures answer 400 with a reason string; job-lifecycle
/// failures arrive later via the caller's callback URL, never here.
pub async fn submit(
    State(state): State<AppState>,
    Json(envelope): Json<FetchEnvelope>,
) -> Result<StatusCode, HttpError> {
    let request = envelope.into_request().map_err(HttpError::from)?;
    let request_type = request.request_type;

    let id = state.manager.submit(request)?;
    tracing::debug!(id = %id, ?request_type, "request accepted");

    Ok(match request_type {
        RequestType::Fetch => StatusCode::ACCEPTED,
        RequestType::Update | RequestType::Cancel => StatusCode::OK,
    })
}

/// Answer a late status query for a job.
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobSnapshot>, HttpError> {
    state
        .manager
        .status(id)
        .map(Json)
        .ok_or_else(|| HttpError::not_found(format!("unknown job: {id}")))
}
