//! Upload orchestration: validation, CAPTCHA, storage routing, persistence, and
//! the read paths that apply the access rules.

mod service;
mod types;

pub use service::UploadService;
pub use types::{Bundle, IncomingFile, UploadForm};
