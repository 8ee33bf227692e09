use rand::Rng;

/// Length of public upload identifiers.
pub const UPLOAD_ID_LEN: usize = 12;

const URL_SAFE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Generate a short, URL-safe public identifier for an upload.
pub fn generate_upload_id() -> String {
    let mut rng = rand::rng();
    (0..UPLOAD_ID_LEN)
        .map(|_| URL_SAFE_ALPHABET[rng.random_range(0..URL_SAFE_ALPHABET.len())] as char)
        .collect()
}

/// Cheap shape check run before hitting the database.
pub fn is_valid_upload_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_url_safe_and_distinct() {
        let ids: HashSet<String> = (0..500).map(|_| generate_upload_id()).collect();
        assert_eq!(ids.len(), 500);
        for id in &ids {
            assert_eq!(id.len(), UPLOAD_ID_LEN);
            assert!(is_valid_upload_id(id));
        }
    }

    #[test]
    fn rejects_path_like_ids() {
        assert!(!is_valid_upload_id("../etc"));
        assert!(!is_valid_upload_id(""));
        assert!(!is_valid_upload_id("abc def"));
    }
}
