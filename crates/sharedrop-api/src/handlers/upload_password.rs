use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use sharedrop_core::models::{VerifyPasswordRequest, VerifyPasswordResponse};
use std::sync::Arc;

/// Check the password of a private upload; on success the content is returned
/// if the upload is still accessible.
#[utoipa::path(
    post,
    path = "/api/uploads/{id}",
    tag = "uploads",
    params(
        ("id" = String, Path, description = "Public upload identifier")
    ),
    request_body = VerifyPasswordRequest,
    responses(
        (status = 200, description = "Password accepted", body = VerifyPasswordResponse),
        (status = 400, description = "Upload is not password protected", body = ErrorResponse),
        (status = 401, description = "Invalid password", body = ErrorResponse),
        (status = 404, description = "Upload not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(upload_id = %id))]
pub async fn verify_upload_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<VerifyPasswordRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let response = state.uploads.verify_password(&id, request.password).await?;
    Ok(Json(response))
}
