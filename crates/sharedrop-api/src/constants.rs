//! API constants

/// API base path prefix
pub const API_PREFIX: &str = "/api";

/// Header carrying the provider's webhook signature
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Razorpay-Signature";

/// Header carrying the password for bundle downloads of private uploads
pub const UPLOAD_PASSWORD_HEADER: &str = "X-Upload-Password";
