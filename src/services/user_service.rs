//! Domain service for employee accounts and profiles.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{Actor, DeletionDenied, Role};
use crate::models::certificate::{CertificateCounts, CertificateView, NamedCount};
use crate::models::user::{User, UserWithCounts};
use crate::services::uploads::UploadError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Deletion(#[from] DeletionDenied),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Account creation request. The password is generated by the service.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub position: String,
    pub role: Role,
    pub is_active: bool,
}

/// A freshly created account with its one-time temporary password.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedUser {
    pub user: User,
    pub temporary_password: String,
}

/// Profile edit. `role` and `is_active` are admin-only.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeDirectory {
    pub employees: Vec<UserWithCounts>,
    pub search: Option<String>,
    pub total_employees: usize,
    pub total_admins: usize,
    pub total_employee_role: usize,
    pub employees_with_certificates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeProfile {
    pub user: User,
    pub can_edit: bool,
    pub counts: CertificateCounts,
    pub expiring_soon: Vec<CertificateView>,
    pub recent_certificates: Vec<CertificateView>,
    pub top_providers: Vec<NamedCount>,
}

/// A stored file ready to be served.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: String,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Active users with their certificate tallies, optionally filtered.
    async fn list_employees(&self, search: Option<&str>) -> Result<EmployeeDirectory, UserError>;

    async fn get_profile(&self, actor: Actor, user_id: i32) -> Result<EmployeeProfile, UserError>;

    /// # Errors
    ///
    /// [`UserError::Forbidden`] unless editing oneself or acting as admin,
    /// and for role or activation changes by non-admins.
    async fn update_profile(
        &self,
        actor: Actor,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<User, UserError>;

    async fn set_photo(
        &self,
        actor: Actor,
        user_id: i32,
        filename: &str,
        data: &[u8],
    ) -> Result<User, UserError>;

    async fn remove_photo(&self, actor: Actor, user_id: i32) -> Result<User, UserError>;

    async fn photo(&self, user_id: i32) -> Result<StoredFile, UserError>;

    /// Creates an account with a generated temporary password.
    async fn create_user(
        &self,
        actor: Actor,
        request: CreateUserRequest,
    ) -> Result<CreatedUser, UserError>;

    /// Deletes a user, their certificates, and every stored file they own.
    ///
    /// # Errors
    ///
    /// [`UserError::Deletion`] when deleting oneself or a superuser.
    async fn delete_user(&self, actor: Actor, user_id: i32) -> Result<User, UserError>;
}
