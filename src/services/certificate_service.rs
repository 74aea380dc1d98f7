//! Domain service for certificates.
//!
//! Every mutating operation checks ownership: employees act on their own
//! certificates, admins on anyone's. Reads are open to any signed-in user.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::db::CategoryCount;
use crate::domain::{Actor, CertificateStatus};
use crate::models::certificate::{CertificateCounts, CertificateView, NamedCount};
use crate::models::user::{User, UserSummary, UserWithCounts};
use crate::services::uploads::UploadError;
use crate::services::user_service::StoredFile;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Certificate not found")]
    NotFound,

    #[error("Employee not found")]
    EmployeeNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CertificateError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CertificateError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Certificate form input, shared by create and update.
#[derive(Debug, Clone)]
pub struct CertificateInput {
    /// Owner. Honored for admins only; employees always own what they save.
    pub user_id: Option<i32>,
    pub name: String,
    pub certification_id: String,
    pub provider_name: String,
    pub category_id: i32,
    pub issue_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub status: CertificateStatus,
    pub verification_url: String,
    pub notes: String,
}

/// Company-wide listing of employees holding certificates.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateOverview {
    pub employees: Vec<UserWithCounts>,
    pub search: Option<String>,
    pub total_employees: usize,
    pub totals: CertificateCounts,
}

/// One person's certificates with their tallies.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeCertificates {
    pub employee: User,
    pub certificates: Vec<CertificateView>,
    pub counts: CertificateCounts,
    pub expiring_soon: Vec<CertificateView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: CertificateStatus,
    pub label: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopEmployee {
    pub employee: UserSummary,
    pub certificate_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsScope {
    Company,
    Own,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificateStatistics {
    pub scope: StatisticsScope,
    pub total_certificates: u64,
    pub by_provider: Vec<NamedCount>,
    pub by_category: Vec<CategoryCount>,
    pub by_status: Vec<StatusCount>,
    pub expiring_soon: Vec<CertificateView>,
    /// Admins only.
    pub top_employees: Option<Vec<TopEmployee>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificateDetail {
    pub certificate: CertificateView,
    pub can_edit: bool,
    pub related: Vec<CertificateView>,
}

#[async_trait::async_trait]
pub trait CertificateService: Send + Sync {
    async fn overview(&self, search: Option<&str>) -> Result<CertificateOverview, CertificateError>;

    async fn for_employee(&self, user_id: i32) -> Result<EmployeeCertificates, CertificateError>;

    async fn statistics(&self, actor: Actor) -> Result<CertificateStatistics, CertificateError>;

    async fn detail(&self, actor: Actor, id: i32) -> Result<CertificateDetail, CertificateError>;

    async fn create(
        &self,
        actor: Actor,
        input: CertificateInput,
    ) -> Result<CertificateView, CertificateError>;

    async fn update(
        &self,
        actor: Actor,
        id: i32,
        input: CertificateInput,
    ) -> Result<CertificateView, CertificateError>;

    async fn delete(&self, actor: Actor, id: i32) -> Result<(), CertificateError>;

    async fn attach_file(
        &self,
        actor: Actor,
        id: i32,
        filename: &str,
        data: &[u8],
    ) -> Result<CertificateView, CertificateError>;

    async fn remove_file(&self, actor: Actor, id: i32) -> Result<CertificateView, CertificateError>;

    async fn file(&self, id: i32) -> Result<StoredFile, CertificateError>;

    /// Flips overdue `ACTIVE` certificates to `EXPIRED`. Returns the number
    /// of rows changed.
    async fn expire_overdue(&self, today: NaiveDate) -> Result<u64, CertificateError>;
}
