//! HMAC-SHA256 signatures used by the payment provider.
//!
//! Signatures travel as lowercase hex and are compared in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use sharedrop_core::AppError;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Signature is missing")]
    Missing,
    #[error("Signature does not match")]
    Mismatch,
    #[error("Invalid signing key")]
    InvalidKey,
}

impl From<SignatureError> for AppError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidKey => AppError::Internal(err.to_string()),
            _ => AppError::InvalidSignature(err.to_string()),
        }
    }
}

/// Hex-encoded HMAC-SHA256 of `message` under `secret`.
pub fn sign(secret: &str, message: &[u8]) -> Result<String, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify(secret: &str, message: &[u8], signature: &str) -> Result<(), SignatureError> {
    let provided = signature.trim();
    if provided.is_empty() {
        return Err(SignatureError::Missing);
    }
    let expected = sign(secret, message)?;
    let provided = provided.to_ascii_lowercase();
    if bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Payload signed by the checkout widget: `{order_id}|{payment_id}`.
pub fn checkout_message(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}
