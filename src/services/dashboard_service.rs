//! Company dashboard aggregates.

use serde::Serialize;
use thiserror::Error;

use crate::domain::CertificateStatus;
use crate::models::certificate::{CertificateView, NamedCount};
use crate::services::certificate_service::TopEmployee;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for DashboardError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for DashboardError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardKpis {
    pub active_employees: u64,
    pub total_certificates: u64,
    pub active_certificates: u64,
    pub expired_certificates: u64,
    pub expiring_soon: u64,
}

/// One slice of the status chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSlice {
    pub status: CertificateStatus,
    pub label: &'static str,
    pub count: u64,
    pub color: &'static str,
}

/// Certificates issued during one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    pub month: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub kpis: DashboardKpis,
    pub status_distribution: Vec<StatusSlice>,
    pub top_providers: Vec<NamedCount>,
    pub timeline: Vec<MonthBucket>,
    pub top_employees: Vec<TopEmployee>,
    pub recent_certificates: Vec<CertificateView>,
    pub expiring_soon: Vec<CertificateView>,
}

#[async_trait::async_trait]
pub trait DashboardService: Send + Sync {
    async fn dashboard(&self) -> Result<Dashboard, DashboardError>;
}
