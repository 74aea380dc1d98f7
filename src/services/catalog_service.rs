//! Domain service for certificate providers and categories.
//!
//! Names are unique case-insensitively. A row that certificates still point
//! at cannot be deleted; providers are retired by clearing `is_active`.

use thiserror::Error;

use crate::models::catalog::{Category, Provider};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Cannot delete {kind} \"{name}\": {count} certificate(s) still reference it")]
    InUse {
        kind: &'static str,
        name: String,
        count: u64,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for CatalogError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Provider form. `website` may be empty.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub name: String,
    pub website: String,
    pub description: String,
    pub is_active: bool,
}

/// Category form. An empty `color` falls back to the default.
#[derive(Debug, Clone)]
pub struct CategoryRequest {
    pub name: String,
    pub description: String,
    pub icon_class: String,
    pub color: String,
}

#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_providers(&self, include_inactive: bool) -> Result<Vec<Provider>, CatalogError>;

    async fn create_provider(&self, request: ProviderRequest) -> Result<Provider, CatalogError>;

    async fn update_provider(
        &self,
        id: i32,
        request: ProviderRequest,
    ) -> Result<Provider, CatalogError>;

    /// # Errors
    ///
    /// [`CatalogError::InUse`] while any certificate references the provider.
    async fn delete_provider(&self, id: i32) -> Result<(), CatalogError>;

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;

    async fn create_category(&self, request: CategoryRequest) -> Result<Category, CatalogError>;

    async fn update_category(
        &self,
        id: i32,
        request: CategoryRequest,
    ) -> Result<Category, CatalogError>;

    /// # Errors
    ///
    /// [`CatalogError::InUse`] while any certificate references the category.
    async fn delete_category(&self, id: i32) -> Result<(), CatalogError>;
}
