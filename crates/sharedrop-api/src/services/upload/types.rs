use bytes::Bytes;
use sharedrop_core::models::UploadMetadata;

/// One file part read from the multipart body
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub data: Bytes,
    pub original_name: String,
    pub mime_type: String,
}

/// Parsed `POST /api/uploads` body
#[derive(Debug, Clone)]
pub struct UploadForm {
    pub metadata: UploadMetadata,
    pub files: Vec<IncomingFile>,
}

/// ZIP archive ready to be sent as an attachment
#[derive(Debug)]
pub struct Bundle {
    pub file_name: String,
    pub data: Vec<u8>,
}
