use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{certificate_providers, certificates};
use crate::models::catalog::{Provider, ProviderInput};

pub struct ProviderRepository {
    conn: DatabaseConnection,
}

impl ProviderRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Provider>> {
        let mut query = certificate_providers::Entity::find();
        if !include_inactive {
            query = query.filter(certificate_providers::Column::IsActive.eq(true));
        }

        let rows = query
            .order_by_asc(certificate_providers::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list providers")?;

        Ok(rows.into_iter().map(Provider::from).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<Provider>> {
        let row = certificate_providers::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query provider")?;

        Ok(row.map(Provider::from))
    }

    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<Provider>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = certificate_providers::Entity::find()
            .filter(certificate_providers::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query providers by ID")?;

        Ok(rows.into_iter().map(Provider::from).collect())
    }

    /// Case-insensitive exact name match.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Provider>> {
        let row = certificate_providers::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(certificate_providers::Column::Name)))
                    .eq(name.trim().to_lowercase()),
            )
            .one(&self.conn)
            .await
            .context("Failed to query provider by name")?;

        Ok(row.map(Provider::from))
    }

    /// Returns the provider matching `name` case-insensitively, creating an
    /// active one when none exists.
    pub async fn get_or_create(&self, name: &str) -> Result<Provider> {
        if let Some(existing) = self.find_by_name(name).await? {
            return Ok(existing);
        }

        self.create(ProviderInput {
            name: name.trim().to_string(),
            website: None,
            description: String::new(),
            is_active: true,
        })
        .await
    }

    pub async fn create(&self, input: ProviderInput) -> Result<Provider> {
        let now = chrono::Utc::now().to_rfc3339();
        let active = certificate_providers::ActiveModel {
            name: Set(input.name),
            website: Set(input.website),
            description: Set(input.description),
            is_active: Set(input.is_active),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert provider")?;

        Ok(Provider::from(model))
    }

    pub async fn update(&self, id: i32, input: ProviderInput) -> Result<Option<Provider>> {
        let Some(model) = certificate_providers::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let mut active: certificate_providers::ActiveModel = model.into();
        active.name = Set(input.name);
        active.website = Set(input.website);
        active.description = Set(input.description);
        active.is_active = Set(input.is_active);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update provider")?;

        Ok(Some(Provider::from(model)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = certificate_providers::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete provider")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn certificate_count(&self, id: i32) -> Result<u64> {
        certificates::Entity::find()
            .filter(certificates::Column::ProviderId.eq(id))
            .count(&self.conn)
            .await
            .context("Failed to count provider certificates")
    }
}
