//! Admin endpoints for key/value variables under `/values`.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use validator::Validate;

use crate::api::dto::ResultData;
use crate::api::dto::variables::UpsertVariableRequest;
use crate::error::AppError;
use crate::state::AppState;

/// Lists all variables.
///
/// # Endpoint
///
/// `GET /values/list`
///
/// # Response
///
/// ```json
/// { "success": true, "message": "", "data": [{ "id": 1, "key": "footer", "value": "..." }] }
/// ```
pub async fn list_variables(State(state): State<AppState>) -> Result<ResultData, AppError> {
    let variables = state.variable_service.list().await?;
    Ok(ResultData::ok("").with_data(variables))
}

/// Creates or replaces a variable by key.
///
/// # Endpoint
///
/// `POST /values`
///
/// # Errors
///
/// Returns 400 Bad Request when the key is empty or longer than 255 characters.
pub async fn save_variable(
    State(state): State<AppState>,
    Json(payload): Json<UpsertVariableRequest>,
) -> Result<ResultData, AppError> {
    payload.validate()?;

    let saved = state
        .variable_service
        .save(&payload.key, &payload.value)
        .await?;
    if saved {
        info!(key = %payload.key, "Variable saved");
    }

    Ok(ResultData::status(saved, "Saved", "Save failed"))
}

/// Deletes a variable by id.
///
/// # Endpoint
///
/// `POST /values/{id}`
pub async fn delete_variable(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ResultData, AppError> {
    let deleted = state.variable_service.delete(id).await?;
    if deleted {
        info!(id, "Variable deleted");
    }

    Ok(ResultData::status(deleted, "Deleted", "Delete failed"))
}
