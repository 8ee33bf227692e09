use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::read_upload_form;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sharedrop_core::models::CreateUploadResponse;
use std::sync::Arc;

/// Create an upload from file parts and a `metadata` JSON part.
#[utoipa::path(
    post,
    path = "/api/uploads",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Upload created", body = CreateUploadResponse),
        (status = 400, description = "Invalid metadata, missing content, oversized file, or failed CAPTCHA", body = ErrorResponse),
        (status = 502, description = "No storage backend accepted the files", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "create_upload"))]
pub async fn create_upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_upload_form(multipart, state.limits.max_file_size).await?;
    let response = state.uploads.create(form).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
