//! Shared key generation for the secondary storage backends.
//!
//! Key format: `{prefix}/{millis}-{suffix}-{filename}` where `suffix` is a short random
//! string, so two files with the same name stored in the same millisecond never collide.

use chrono::Utc;
use uuid::Uuid;

pub const KEY_PREFIX: &str = "uploads";

const MAX_FILENAME_LEN: usize = 128;

/// Generate a storage key for the given original filename.
pub fn generate_storage_key(filename: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}/{}-{}-{}",
        KEY_PREFIX,
        Utc::now().timestamp_millis(),
        &suffix[..8],
        sanitize_key_component(filename)
    )
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_` and bound the length.
pub fn sanitize_key_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_LEN)
        .collect();

    let mut cleaned = cleaned;
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", "_");
    }
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Keys must stay relative and must not traverse upwards.
pub fn validate_key(key: &str) -> bool {
    !key.is_empty() && !key.contains("..") && !key.starts_with('/') && !key.contains('\\')
}
