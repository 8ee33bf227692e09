use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sharedrop_core::models::{DeleteUploadRequest, SuccessResponse};
use std::sync::Arc;

#[utoipa::path(
    delete,
    path = "/api/uploads/{id}",
    tag = "uploads",
    params(
        ("id" = String, Path, description = "Public upload identifier")
    ),
    request_body = DeleteUploadRequest,
    responses(
        (status = 200, description = "Upload deleted", body = SuccessResponse),
        (status = 403, description = "Device does not own the upload", body = ErrorResponse),
        (status = 404, description = "Upload not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(upload_id = %id, operation = "delete_upload"))]
pub async fn delete_upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<DeleteUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.uploads.delete(&id, &request.device_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}
