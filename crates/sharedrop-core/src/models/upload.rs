use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::payment::PaymentAttempt;
use crate::storage_types::StorageBackend;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

const EXECUTABLE_EXTENSIONS: &[&str] = &["apk", "aab", "exe", "dmg", "pkg", "deb", "rpm"];
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf",
];

/// Coarse file category derived from MIME type and extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_category", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Video,
    Document,
    Executable,
    Other,
}

impl FileCategory {
    /// MIME prefix wins; the extension lists are only consulted for everything else.
    pub fn classify(mime_type: &str, file_name: &str) -> Self {
        let mime = mime_type.to_ascii_lowercase();
        if mime.starts_with("image/") {
            return FileCategory::Image;
        }
        if mime.starts_with("video/") {
            return FileCategory::Video;
        }

        let ext = match file_name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return FileCategory::Other,
        };

        if EXECUTABLE_EXTENSIONS.contains(&ext.as_str()) {
            FileCategory::Executable
        } else if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
            FileCategory::Document
        } else {
            FileCategory::Other
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, FileCategory::Image | FileCategory::Video)
    }
}

impl Display for FileCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s = match self {
            FileCategory::Image => "image",
            FileCategory::Video => "video",
            FileCategory::Document => "document",
            FileCategory::Executable => "executable",
            FileCategory::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Upload record entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct UploadRecord {
    pub id: Uuid,
    pub upload_id: String,
    pub device_id: String,
    pub is_private: bool,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_paid: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// File held by a storage backend on behalf of an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct StoredFile {
    pub id: Uuid,
    pub upload_id: Uuid,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub category: FileCategory,
    pub backend: StorageBackend,
    pub storage_key: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Ordered text/HTML block attached to an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct TextBlock {
    pub id: Uuid,
    pub upload_id: Uuid,
    pub title: String,
    pub content: String,
    pub position: i32,
}

/// File descriptor produced by the storage router, ready to persist
#[derive(Debug, Clone)]
pub struct NewStoredFile {
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub category: FileCategory,
    pub backend: StorageBackend,
    pub storage_key: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct NewTextBlock {
    pub title: String,
    pub content: String,
}

/// Everything written in the single upload-creation transaction
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub upload_id: String,
    pub device_id: String,
    pub is_private: bool,
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub files: Vec<NewStoredFile>,
    /// Positions are assigned from the vector order.
    pub text_blocks: Vec<NewTextBlock>,
    /// Private uploads get a pending payment attempt up front.
    pub create_pending_payment: bool,
}

/// Upload with all owned entities loaded
#[derive(Debug, Clone)]
pub struct UploadDetails {
    pub record: UploadRecord,
    pub files: Vec<StoredFile>,
    pub text_blocks: Vec<TextBlock>,
    pub payment: Option<PaymentAttempt>,
}

/// Per-device listing row
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct UploadSummary {
    pub upload_id: String,
    pub is_private: bool,
    pub is_paid: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub file_count: i64,
    pub text_count: i64,
}

/// Text box submitted with an upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextBoxInput {
    /// Client-side identifier, ignored by the server
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
}

/// JSON carried in the `metadata` multipart field
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    #[validate(length(min = 1, max = 128, message = "deviceId is required"))]
    pub device_id: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    /// bcrypt reads at most 72 bytes; longer passwords are rejected by the upload flow
    #[validate(length(min = 1, max = 72, message = "password must be 1-72 characters"))]
    pub password: Option<String>,
    #[serde(default)]
    pub captcha_token: Option<String>,
    #[serde(default)]
    #[validate(length(max = 50, message = "at most 50 text boxes are allowed"))]
    pub text_boxes: Vec<TextBoxInput>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadResponse {
    pub upload_id: String,
    pub expires_at: DateTime<Utc>,
    pub requires_payment: bool,
    pub file_count: usize,
    pub text_count: usize,
    /// Names of files that no backend accepted
    pub failed_files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadView {
    pub upload_id: String,
    pub is_private: bool,
    pub is_paid: bool,
    pub expires_at: DateTime<Utc>,
    pub expired: bool,
    pub can_access: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileResponse {
    pub id: Uuid,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub category: FileCategory,
    #[schema(value_type = String)]
    pub backend: StorageBackend,
    pub url: String,
}

impl From<StoredFile> for StoredFileResponse {
    fn from(file: StoredFile) -> Self {
        Self {
            id: file.id,
            original_name: file.original_name,
            mime_type: file.mime_type,
            size: file.size_bytes,
            category: file.category,
            backend: file.backend,
            url: file.url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextBlockResponse {
    pub title: String,
    pub content: String,
    pub order: i32,
}

impl From<TextBlock> for TextBlockResponse {
    fn from(block: TextBlock) -> Self {
        Self {
            title: block.title,
            content: block.content,
            order: block.position,
        }
    }
}

/// Response for `GET /api/uploads/{id}`
///
/// Always carries the full structure; clients gate display on `upload.canAccess`
/// and, for private uploads, on a prior password verification.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadDetailsResponse {
    pub upload: UploadView,
    pub files: Vec<StoredFileResponse>,
    pub text_content: Vec<TextBlockResponse>,
    pub payment: Option<crate::models::payment::PaymentSummary>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordRequest {
    #[serde(default)]
    pub password: String,
}

/// Successful password check; carries the content when the upload is accessible
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPasswordResponse {
    pub success: bool,
    pub can_access: bool,
    pub files: Vec<StoredFileResponse>,
    pub text_content: Vec<TextBlockResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUploadRequest {
    pub device_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub device_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub upload_id: String,
    pub file_count: i64,
    pub text_box_count: i64,
    pub is_private: bool,
    pub is_paid: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub share_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub history: Vec<HistoryItem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}
