use crate::constants::UPLOAD_PASSWORD_HEADER;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use sharedrop_core::AppError;
use std::sync::Arc;

/// Download every file and text block of an upload as one ZIP archive.
///
/// Private uploads take their password in the `X-Upload-Password` header.
#[utoipa::path(
    get,
    path = "/api/bundle/{id}",
    tag = "uploads",
    params(
        ("id" = String, Path, description = "Public upload identifier"),
        ("X-Upload-Password" = Option<String>, Header, description = "Password for private uploads")
    ),
    responses(
        (status = 200, description = "ZIP archive", content_type = "application/zip"),
        (status = 401, description = "Missing or invalid password", body = ErrorResponse),
        (status = 402, description = "Upload expired; payment required", body = ErrorResponse),
        (status = 404, description = "Upload not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers), fields(upload_id = %id))]
pub async fn download_bundle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpAppError> {
    let password = headers
        .get(UPLOAD_PASSWORD_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let bundle = state.uploads.bundle(&id, password).await?;

    let disposition =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", bundle.file_name))
            .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition: {}", e)))?;

    tracing::info!(bytes = bundle.data.len(), "Bundle built");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/zip")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bundle.data,
    ))
}
