use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sharedrop_core::models::UploadDetailsResponse;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/uploads/{id}",
    tag = "uploads",
    params(
        ("id" = String, Path, description = "Public upload identifier")
    ),
    responses(
        (status = 200, description = "Upload with access state, content, and payment", body = UploadDetailsResponse),
        (status = 404, description = "Upload not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(upload_id = %id))]
pub async fn get_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let details = state.uploads.details(&id).await?;
    Ok(Json(details))
}
