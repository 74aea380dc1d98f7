//! Domain service for authentication.
//!
//! Handles credential checks, session user lookup, and password changes.

use thiserror::Error;

use crate::models::user::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("This account has been deactivated. Please contact an administrator.")]
    Inactive,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and records the login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown email or a
    /// wrong password, and [`AuthError::Inactive`] for a deactivated account
    /// with correct credentials.
    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Resolves the user behind a session. Missing or deactivated users are
    /// [`AuthError::Unauthorized`].
    async fn session_user(&self, user_id: i32) -> Result<User, AuthError>;

    /// Changes a user's password and clears the forced-change flag.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] if the current password is wrong or
    /// the new one breaks the password policy.
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}
