use anyhow::{Context, Result};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{certificate_categories, certificates};
use crate::models::catalog::{Category, CategoryInput};

pub struct CategoryRepository {
    conn: DatabaseConnection,
}

impl CategoryRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Category>> {
        let rows = certificate_categories::Entity::find()
            .order_by_asc(certificate_categories::Column::Name)
            .all(&self.conn)
            .await
            .context("Failed to list categories")?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    pub async fn get(&self, id: i32) -> Result<Option<Category>> {
        let row = certificate_categories::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query category")?;

        Ok(row.map(Category::from))
    }

    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<Category>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = certificate_categories::Entity::find()
            .filter(certificate_categories::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query categories by ID")?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = certificate_categories::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(certificate_categories::Column::Name)))
                    .eq(name.trim().to_lowercase()),
            )
            .one(&self.conn)
            .await
            .context("Failed to query category by name")?;

        Ok(row.map(Category::from))
    }

    pub async fn create(&self, input: CategoryInput) -> Result<Category> {
        let now = chrono::Utc::now().to_rfc3339();
        let active = certificate_categories::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            icon_class: Set(input.icon_class),
            color: Set(input.color),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert category")?;

        Ok(Category::from(model))
    }

    pub async fn update(&self, id: i32, input: CategoryInput) -> Result<Option<Category>> {
        let Some(model) = certificate_categories::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let mut active: certificate_categories::ActiveModel = model.into();
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.icon_class = Set(input.icon_class);
        active.color = Set(input.color);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update category")?;

        Ok(Some(Category::from(model)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = certificate_categories::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete category")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn certificate_count(&self, id: i32) -> Result<u64> {
        certificates::Entity::find()
            .filter(certificates::Column::CategoryId.eq(id))
            .count(&self.conn)
            .await
            .context("Failed to count category certificates")
    }
}
