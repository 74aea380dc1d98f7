use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::expiry;
use crate::domain::{CertificateStatus, ExpiryState};
use crate::entities::certificates;
use crate::models::catalog::{Category, Provider};
use crate::models::user::{User, UserSummary};

#[derive(Debug, Clone, Serialize)]
pub struct Certificate {
    pub id: i32,
    pub user_id: i32,
    pub provider_id: i32,
    pub category_id: i32,
    pub name: String,
    pub certification_id: String,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub status: CertificateStatus,
    pub certificate_file: Option<String>,
    pub verification_url: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<certificates::Model> for Certificate {
    type Error = anyhow::Error;

    fn try_from(model: certificates::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            status: model.status.parse()?,
            user_id: model.user_id,
            provider_id: model.provider_id,
            category_id: model.category_id,
            name: model.name,
            certification_id: model.certification_id,
            issue_date: model.issue_date,
            expiry_date: model.expiry_date,
            certificate_file: model.certificate_file,
            verification_url: model.verification_url,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl Certificate {
    #[must_use]
    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        expiry::days_until_expiry(self.expiry_date, today)
    }

    #[must_use]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        expiry::is_expired(self.expiry_date, today)
    }

    #[must_use]
    pub fn is_expiring_soon(&self, today: NaiveDate, threshold_days: i64) -> bool {
        expiry::is_expiring_soon(self.expiry_date, today, threshold_days)
    }
}

/// Values written by create and update. Updates replace every field.
#[derive(Debug, Clone)]
pub struct CertificateDraft {
    pub user_id: i32,
    pub provider_id: i32,
    pub category_id: i32,
    pub name: String,
    pub certification_id: String,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub status: CertificateStatus,
    pub verification_url: String,
    pub notes: String,
}

/// A certificate joined with its owner, provider and category.
#[derive(Debug, Clone)]
pub struct CertificateRecord {
    pub certificate: Certificate,
    pub owner: User,
    pub provider: Provider,
    pub category: Category,
}

impl CertificateRecord {
    #[must_use]
    pub fn view(&self, today: NaiveDate, threshold_days: i64) -> CertificateView {
        let cert = &self.certificate;
        let days_until_expiry = cert.days_until_expiry(today);
        CertificateView {
            certificate: cert.clone(),
            owner: UserSummary::from(&self.owner),
            provider_name: self.provider.name.clone(),
            category_name: self.category.name.clone(),
            category_color: self.category.color.clone(),
            days_until_expiry,
            days_expired: days_until_expiry.filter(|d| *d < 0).map(i64::abs),
            is_expired: cert.is_expired(today),
            is_expiring_soon: cert.is_expiring_soon(today, threshold_days),
            expiry_state: ExpiryState::classify(cert.expiry_date, today, threshold_days),
        }
    }
}

/// Serialized form of a certificate with its derived expiry fields.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateView {
    #[serde(flatten)]
    pub certificate: Certificate,
    pub owner: UserSummary,
    pub provider_name: String,
    pub category_name: String,
    pub category_color: String,
    pub days_until_expiry: Option<i64>,
    pub days_expired: Option<i64>,
    pub is_expired: bool,
    pub is_expiring_soon: bool,
    pub expiry_state: ExpiryState,
}

/// Status tallies for a set of certificates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CertificateCounts {
    pub total: u64,
    pub active: u64,
    pub expired: u64,
    pub revoked: u64,
    pub expiring_soon: u64,
}

impl CertificateCounts {
    pub fn add(&mut self, status: CertificateStatus, count: u64) {
        self.total += count;
        match status {
            CertificateStatus::Active => self.active += count,
            CertificateStatus::Expired => self.expired += count,
            CertificateStatus::Revoked => self.revoked += count,
        }
    }
}

/// A `(label, count)` bucket used by statistics and charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_accumulate_by_status() {
        let mut counts = CertificateCounts::default();
        counts.add(CertificateStatus::Active, 3);
        counts.add(CertificateStatus::Expired, 2);
        counts.add(CertificateStatus::Revoked, 1);
        assert_eq!(counts.total, 6);
        assert_eq!(counts.active, 3);
        assert_eq!(counts.expired, 2);
        assert_eq!(counts.revoked, 1);
    }
}
