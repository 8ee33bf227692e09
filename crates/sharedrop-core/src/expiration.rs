//! Expiration policy
//!
//! Every upload gets a fixed retention window from its creation time. Paid
//! uploads are rewritten to a far-future sentinel so they never lapse.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Retention window for unpaid uploads.
pub const RETENTION_HOURS: i64 = 24;

/// Expiry stamped on paid uploads.
pub fn lifetime_sentinel() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2099, 12, 31, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn compute_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::hours(RETENTION_HOURS)
}

/// Evaluated against the wall clock on every call; never cache the result.
pub fn is_expired(expires_at: DateTime<Utc>) -> bool {
    is_expired_at(expires_at, Utc::now())
}

/// Strictly after: an upload is still live at the exact expiry instant.
pub fn is_expired_at(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expires_at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_created_plus_24_hours() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let expires = compute_expiry(created);
        assert_eq!(
            expires,
            Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let expires = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        assert!(!is_expired_at(expires, expires));
        assert!(is_expired_at(expires, expires + Duration::seconds(1)));
        assert!(!is_expired_at(expires, expires - Duration::hours(1)));
    }

    #[test]
    fn sentinel_never_expires_in_practice() {
        assert!(!is_expired(lifetime_sentinel()));
        assert_eq!(lifetime_sentinel().to_rfc3339(), "2099-12-31T00:00:00+00:00");
    }
}
