//! `SeaORM` implementation of the `CatalogService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::db::Store;
use crate::models::catalog::{
    Category, CategoryInput, DEFAULT_CATEGORY_COLOR, Provider, ProviderInput,
};
use crate::services::catalog_service::{
    CatalogError, CatalogService, CategoryRequest, ProviderRequest,
};
use crate::services::fields;

pub struct SeaOrmCatalogService {
    store: Store,
}

impl SeaOrmCatalogService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    fn provider_input(request: ProviderRequest) -> Result<ProviderInput, CatalogError> {
        let name =
            fields::validate_provider_name(&request.name).map_err(CatalogError::Validation)?;
        let website =
            fields::validate_http_url(&request.website).map_err(CatalogError::Validation)?;

        Ok(ProviderInput {
            name,
            website: (!website.is_empty()).then_some(website),
            description: request.description.trim().to_string(),
            is_active: request.is_active,
        })
    }

    fn category_input(request: CategoryRequest) -> Result<CategoryInput, CatalogError> {
        let name = fields::validate_required(
            &request.name,
            "Category name",
            fields::MAX_CATALOG_NAME_LEN,
        )
        .map_err(CatalogError::Validation)?;

        let color = if request.color.trim().is_empty() {
            DEFAULT_CATEGORY_COLOR.to_string()
        } else {
            fields::validate_hex_color(&request.color).map_err(CatalogError::Validation)?
        };

        Ok(CategoryInput {
            name,
            description: request.description.trim().to_string(),
            icon_class: request.icon_class.trim().to_string(),
            color,
        })
    }

    /// Rejects `name` when another provider already uses it.
    async fn ensure_provider_name_free(
        &self,
        name: &str,
        current_id: Option<i32>,
    ) -> Result<(), CatalogError> {
        match self.store.find_provider_by_name(name).await? {
            Some(existing) if Some(existing.id) != current_id => Err(CatalogError::Conflict(
                format!("A provider named \"{}\" already exists.", existing.name),
            )),
            _ => Ok(()),
        }
    }

    async fn ensure_category_name_free(
        &self,
        name: &str,
        current_id: Option<i32>,
    ) -> Result<(), CatalogError> {
        match self.store.find_category_by_name(name).await? {
            Some(existing) if Some(existing.id) != current_id => Err(CatalogError::Conflict(
                format!("A category named \"{}\" already exists.", existing.name),
            )),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CatalogService for SeaOrmCatalogService {
    async fn list_providers(&self, include_inactive: bool) -> Result<Vec<Provider>, CatalogError> {
        Ok(self.store.list_providers(include_inactive).await?)
    }

    async fn create_provider(&self, request: ProviderRequest) -> Result<Provider, CatalogError> {
        let input = Self::provider_input(request)?;
        self.ensure_provider_name_free(&input.name, None).await?;

        let provider = self.store.create_provider(input).await?;
        info!(provider_id = provider.id, name = %provider.name, "Created provider");
        Ok(provider)
    }

    async fn update_provider(
        &self,
        id: i32,
        request: ProviderRequest,
    ) -> Result<Provider, CatalogError> {
        let input = Self::provider_input(request)?;
        self.ensure_provider_name_free(&input.name, Some(id)).await?;

        self.store
            .update_provider(id, input)
            .await?
            .ok_or(CatalogError::NotFound("Provider"))
    }

    async fn delete_provider(&self, id: i32) -> Result<(), CatalogError> {
        let provider = self
            .store
            .get_provider(id)
            .await?
            .ok_or(CatalogError::NotFound("Provider"))?;

        let count = self.store.provider_certificate_count(id).await?;
        if count > 0 {
            return Err(CatalogError::InUse {
                kind: "provider",
                name: provider.name,
                count,
            });
        }

        if !self.store.delete_provider(id).await? {
            return Err(CatalogError::NotFound("Provider"));
        }
        info!(provider_id = id, name = %provider.name, "Deleted provider");
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        Ok(self.store.list_categories().await?)
    }

    async fn create_category(&self, request: CategoryRequest) -> Result<Category, CatalogError> {
        let input = Self::category_input(request)?;
        self.ensure_category_name_free(&input.name, None).await?;

        let category = self.store.create_category(input).await?;
        info!(category_id = category.id, name = %category.name, "Created category");
        Ok(category)
    }

    async fn update_category(
        &self,
        id: i32,
        request: CategoryRequest,
    ) -> Result<Category, CatalogError> {
        let input = Self::category_input(request)?;
        self.ensure_category_name_free(&input.name, Some(id)).await?;

        self.store
            .update_category(id, input)
            .await?
            .ok_or(CatalogError::NotFound("Category"))
    }

    async fn delete_category(&self, id: i32) -> Result<(), CatalogError> {
        let category = self
            .store
            .get_category(id)
            .await?
            .ok_or(CatalogError::NotFound("Category"))?;

        let count = self.store.category_certificate_count(id).await?;
        if count > 0 {
            return Err(CatalogError::InUse {
                kind: "category",
                name: category.name,
                count,
            });
        }

        if !self.store.delete_category(id).await? {
            return Err(CatalogError::NotFound("Category"));
        }
        info!(category_id = id, name = %category.name, "Deleted category");
        Ok(())
    }
}
