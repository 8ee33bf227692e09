//! Access evaluator
//!
//! Two independent gates guard an upload:
//!
//! * the time gate: `can_access = paid || !expired`
//! * the password gate: private uploads reveal content only after a bcrypt match
//!
//! Paying lifts the time gate permanently but never the password gate.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::expiration;
use crate::models::UploadRecord;

/// Default bcrypt work factor for upload passwords.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// bcrypt ignores input past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessReason {
    /// Within the retention window
    Active,
    /// Paid; expiry no longer applies
    Lifetime,
    /// Retention window elapsed and no payment recorded
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub expired: bool,
    pub can_access: bool,
    pub reason: AccessReason,
}

/// Evaluate the time gate against the current wall clock.
pub fn evaluate(record: &UploadRecord) -> AccessDecision {
    evaluate_at(record, Utc::now())
}

pub fn evaluate_at(record: &UploadRecord, now: DateTime<Utc>) -> AccessDecision {
    if record.is_paid {
        return AccessDecision {
            expired: false,
            can_access: true,
            reason: AccessReason::Lifetime,
        };
    }

    let expired = expiration::is_expired_at(record.expires_at, now);
    AccessDecision {
        expired,
        can_access: !expired,
        reason: if expired {
            AccessReason::Expired
        } else {
            AccessReason::Active
        },
    }
}

/// Fail with `AccessExpired` unless the time gate is open.
pub fn ensure_accessible(record: &UploadRecord) -> Result<AccessDecision, AppError> {
    let decision = evaluate(record);
    if decision.can_access {
        Ok(decision)
    } else {
        Err(AppError::AccessExpired(
            "Upload has expired. Payment required.".to_string(),
        ))
    }
}

/// Reject passwords bcrypt would silently truncate.
pub fn check_password_length(password: &str) -> Result<(), AppError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::BadRequest(format!(
            "Password must be at most {} bytes",
            MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    check_password_length(password)?;
    Ok(bcrypt::hash(password, cost)?)
}

/// Check a candidate password against a private upload.
///
/// Blocking (bcrypt); run it on the blocking pool from async code.
pub fn verify_password(record: &UploadRecord, candidate: &str) -> Result<(), AppError> {
    let hash = match (record.is_private, record.password_hash.as_deref()) {
        (true, Some(hash)) => hash,
        _ => {
            return Err(AppError::BadRequest(
                "Upload is not password protected".to_string(),
            ))
        }
    };

    // A malformed stored hash is treated as a mismatch, never as a match.
    let matches = bcrypt::verify(candidate, hash).unwrap_or(false);
    if matches {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Invalid password".to_string()))
    }
}
