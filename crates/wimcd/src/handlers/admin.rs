//! Admin-surface handlers: agent registration.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use wimc_core::job::TransferMethod;

use crate::error::HttpError;
use crate::state::AppState;

/// Body of an agent registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    /// Transfer method the agent performs.
    pub method: String,
    /// Where the agent receives dispatch commands.
    pub url: String,
}

/// Register an agent under its id. Overwrites any agent already holding
/// the method.
pub async fn register(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RegisterBody>,
) -> Result<StatusCode, HttpError> {
    let method = TransferMethod::from_wire(&body.method)
        .ok_or_else(|| HttpError::bad_request(format!("unknown transfer method: {}", body.method)))?;
    if body.url.is_empty() {
        return Err(HttpError::bad_request("agent url must not be empty"));
    }

    state.agents.register(id, method, body.url);
    Ok(StatusCode::OK)
}

/// Unregister an agent by id.
pub async fn unregister(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HttpError> {
    if state.agents.unregister_by_id(id) {
        Ok(StatusCode::OK)
    } else {
        Err(HttpError::not_found(format!("unknown agent: {id}")))
    }
}
