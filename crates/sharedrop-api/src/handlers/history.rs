use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use sharedrop_core::models::{HistoryQuery, HistoryResponse};
use std::sync::Arc;

/// Uploads created by a device, newest first.
#[utoipa::path(
    get,
    path = "/api/history",
    tag = "uploads",
    params(
        ("deviceId" = String, Query, description = "Device identifier used at upload time")
    ),
    responses(
        (status = 200, description = "Upload history", body = HistoryResponse),
        (status = 400, description = "deviceId missing", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, query))]
pub async fn list_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let device_id = query.device_id.unwrap_or_default();
    let history = state.uploads.history(&device_id).await?;
    Ok(Json(history))
}
