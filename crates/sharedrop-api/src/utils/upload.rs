//! Multipart parsing for upload creation

use crate::services::upload::{IncomingFile, UploadForm};
use axum::extract::Multipart;
use bytes::BytesMut;
use sharedrop_core::models::UploadMetadata;
use sharedrop_core::AppError;

const METADATA_FIELD: &str = "metadata";
const FILE_FIELD_PREFIX: &str = "file";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const MAX_FILENAME_LENGTH: usize = 255;

/// Read the `metadata` JSON field and every field whose name starts with `file`.
///
/// Files are streamed chunk by chunk so an oversized part is rejected before it is
/// fully buffered. Parts with no file name and no bytes are ignored.
pub async fn read_upload_form(
    mut multipart: Multipart,
    max_file_size: usize,
) -> Result<UploadForm, AppError> {
    let mut metadata: Option<UploadMetadata> = None;
    let mut files = Vec::new();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == METADATA_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read metadata: {}", e)))?;
            let parsed: UploadMetadata = serde_json::from_str(&text)
                .map_err(|e| AppError::InvalidInput(format!("Invalid metadata: {}", e)))?;
            metadata = Some(parsed);
            continue;
        }

        if !field_name.starts_with(FILE_FIELD_PREFIX) {
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());

        let mut buffer = BytesMut::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?
        {
            validate_file_size(buffer.len() + chunk.len(), max_file_size)?;
            buffer.extend_from_slice(&chunk);
        }

        if file_name.is_none() && buffer.is_empty() {
            continue;
        }

        files.push(IncomingFile {
            data: buffer.freeze(),
            original_name: clean_filename(file_name.as_deref().unwrap_or_default()),
            mime_type: normalize_mime_type(content_type.as_deref().unwrap_or_default()),
        });
    }

    let metadata = metadata
        .ok_or_else(|| AppError::InvalidInput("metadata field is required".to_string()))?;

    Ok(UploadForm { metadata, files })
}

pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::InvalidInput(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

/// Keep the last path component of a client-supplied file name.
///
/// The result is only displayed and used as an archive entry name; storage keys are
/// derived separately.
pub fn clean_filename(filename: &str) -> String {
    let last = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        return "file".to_string();
    }

    last.chars().take(MAX_FILENAME_LENGTH).collect()
}

/// Lowercase and strip parameters ("image/JPEG; q=1" -> "image/jpeg").
pub fn normalize_mime_type(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or_default();

    if essence.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        essence.to_ascii_lowercase()
    }
}
