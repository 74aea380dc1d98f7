//! Domain primitives for certificate tracking.
//!
//! Roles and certificate statuses are persisted as upper-case strings
//! (`ADMIN`, `EMPLOYEE`, `ACTIVE`, ...). These enums are the typed view of
//! those columns; every conversion from the database goes through
//! [`std::str::FromStr`] so an unknown value surfaces as an error instead of
//! silently defaulting.

pub mod access;
pub mod expiry;

pub use access::{Actor, DeletionDenied};
pub use expiry::{ExpiryState, effective_status};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a persisted enum column holds an unknown value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Authorization role of a user.
///
/// # Examples
///
/// ```rust
/// use certrack::domain::Role;
///
/// let role: Role = "ADMIN".parse().unwrap();
/// assert_eq!(role, Role::Admin);
/// assert_eq!(role.as_str(), "ADMIN");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Can manage users, catalog entries and every certificate.
    Admin,
    /// Can manage only their own certificates and profile.
    #[default]
    Employee,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Employee => "EMPLOYEE",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Employee => "Employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Self::Admin),
            "EMPLOYEE" => Ok(Self::Employee),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    #[default]
    Active,
    Expired,
    Revoked,
}

impl CertificateStatus {
    pub const ALL: [Self; 3] = [Self::Active, Self::Expired, Self::Revoked];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
            Self::Revoked => "REVOKED",
        }
    }

    /// Human readable label, e.g. `Active`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Expired => "Expired",
            Self::Revoked => "Revoked",
        }
    }

    /// Chart color used by the dashboard status distribution.
    #[must_use]
    pub const fn chart_color(self) -> &'static str {
        match self {
            Self::Active => "#10b981",
            Self::Expired => "#ef4444",
            Self::Revoked => "#6b7280",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "EXPIRED" => Ok(Self::Expired),
            "REVOKED" => Ok(Self::Revoked),
            other => Err(ParseEnumError {
                kind: "certificate status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Admin, Role::Employee] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert_eq!(
            "REVOKED".parse::<CertificateStatus>().unwrap(),
            CertificateStatus::Revoked
        );
        let err = "PENDING".parse::<CertificateStatus>().unwrap_err();
        assert_eq!(err.to_string(), "unknown certificate status: PENDING");
    }

    #[test]
    fn test_status_serde_uses_upper_case() {
        let json = serde_json::to_string(&CertificateStatus::Expired).unwrap();
        assert_eq!(json, "\"EXPIRED\"");
        let parsed: Role = serde_json::from_str("\"EMPLOYEE\"").unwrap();
        assert_eq!(parsed, Role::Employee);
    }
}
