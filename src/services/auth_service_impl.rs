//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::SecurityConfig;
use crate::db::{Store, hash_password};
use crate::models::user::User;
use crate::services::auth_service::{AuthError, AuthService};
use crate::services::passwords::check_new_password;
use anyhow::Context;
use async_trait::async_trait;

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .get_user_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.store.verify_user_password(user.id, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        self.store.touch_last_login(user.id).await?;

        Ok(user)
    }

    async fn session_user(&self, user_id: i32) -> Result<User, AuthError> {
        match self.store.get_user(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AuthError::Unauthorized),
        }
    }

    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        check_new_password(
            current_password,
            new_password,
            self.security.min_password_length,
        )
        .map_err(AuthError::Validation)?;

        let is_valid = self
            .store
            .verify_user_password(user_id, current_password)
            .await?;

        if !is_valid {
            return Err(AuthError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        let password = new_password.to_string();
        let security = self.security.clone();
        let new_hash =
            tokio::task::spawn_blocking(move || hash_password(&password, Some(&security)))
                .await
                .context("Password hashing task panicked")??;

        self.store.set_user_password_hash(user_id, new_hash).await?;

        Ok(())
    }
}
