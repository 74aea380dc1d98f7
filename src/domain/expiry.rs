//! Expiry arithmetic for certificates.
//!
//! Every function takes `today` explicitly so callers decide the clock and
//! tests stay deterministic. A certificate without an expiry date is a
//! lifetime certification: it never expires and is never "expiring soon".

use chrono::NaiveDate;
use serde::Serialize;

use super::CertificateStatus;

/// The server's current local date.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Days until expiry. Negative once the date has passed, `None` for lifetime
/// certifications.
#[must_use]
pub fn days_until_expiry(expiry: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    expiry.map(|date| (date - today).num_days())
}

#[must_use]
pub fn is_expired(expiry: Option<NaiveDate>, today: NaiveDate) -> bool {
    expiry.is_some_and(|date| date < today)
}

/// True when the certificate expires within `threshold_days`, exclusive of
/// today and inclusive of the threshold.
#[must_use]
pub fn is_expiring_soon(expiry: Option<NaiveDate>, today: NaiveDate, threshold_days: i64) -> bool {
    days_until_expiry(expiry, today).is_some_and(|days| 0 < days && days <= threshold_days)
}

/// Status to persist when saving a certificate.
///
/// An `ACTIVE` certificate past its expiry date is stored as `EXPIRED`.
/// `REVOKED` and `EXPIRED` are left alone.
#[must_use]
pub fn effective_status(
    status: CertificateStatus,
    expiry: Option<NaiveDate>,
    today: NaiveDate,
) -> CertificateStatus {
    if status == CertificateStatus::Active && is_expired(expiry, today) {
        CertificateStatus::Expired
    } else {
        status
    }
}

/// Expiry classification shown next to a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryState {
    Lifetime,
    Expired,
    ExpiringSoon,
    Valid,
}

impl ExpiryState {
    #[must_use]
    pub fn classify(expiry: Option<NaiveDate>, today: NaiveDate, threshold_days: i64) -> Self {
        if expiry.is_none() {
            Self::Lifetime
        } else if is_expired(expiry, today) {
            Self::Expired
        } else if is_expiring_soon(expiry, today, threshold_days) {
            Self::ExpiringSoon
        } else {
            Self::Valid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_until_expiry() {
        let today = date(2026, 3, 1);
        assert_eq!(days_until_expiry(None, today), None);
        assert_eq!(days_until_expiry(Some(date(2026, 3, 11)), today), Some(10));
        assert_eq!(days_until_expiry(Some(date(2026, 2, 27)), today), Some(-2));
    }

    #[test]
    fn test_is_expired_is_strict() {
        let today = date(2026, 3, 1);
        assert!(!is_expired(None, today));
        assert!(!is_expired(Some(today), today));
        assert!(is_expired(Some(date(2026, 2, 28)), today));
    }

    #[test]
    fn test_expiring_soon_window() {
        let today = date(2026, 1, 1);
        assert!(!is_expiring_soon(Some(today), today, 90));
        assert!(is_expiring_soon(Some(date(2026, 1, 2)), today, 90));
        assert!(is_expiring_soon(Some(date(2026, 4, 1)), today, 90));
        assert!(!is_expiring_soon(Some(date(2026, 4, 2)), today, 90));
        assert!(!is_expiring_soon(Some(date(2025, 12, 31)), today, 90));
        assert!(!is_expiring_soon(None, today, 90));
    }

    #[test]
    fn test_active_past_expiry_becomes_expired() {
        let today = date(2026, 6, 15);
        let past = Some(date(2026, 6, 14));
        assert_eq!(
            effective_status(CertificateStatus::Active, past, today),
            CertificateStatus::Expired
        );
    }

    #[test]
    fn test_effective_status_leaves_other_states() {
        let today = date(2026, 6, 15);
        let past = Some(date(2020, 1, 1));
        assert_eq!(
            effective_status(CertificateStatus::Revoked, past, today),
            CertificateStatus::Revoked
        );
        assert_eq!(
            effective_status(CertificateStatus::Active, None, today),
            CertificateStatus::Active
        );
        assert_eq!(
            effective_status(CertificateStatus::Active, Some(today), today),
            CertificateStatus::Active
        );
    }

    #[test]
    fn test_classify() {
        let today = date(2026, 1, 1);
        assert_eq!(ExpiryState::classify(None, today, 90), ExpiryState::Lifetime);
        assert_eq!(
            ExpiryState::classify(Some(date(2025, 1, 1)), today, 90),
            ExpiryState::Expired
        );
        assert_eq!(
            ExpiryState::classify(Some(date(2026, 2, 1)), today, 90),
            ExpiryState::ExpiringSoon
        );
        assert_eq!(
            ExpiryState::classify(Some(date(2027, 2, 1)), today, 90),
            ExpiryState::Valid
        );
    }
}
