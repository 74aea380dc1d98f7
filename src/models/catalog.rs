use serde::Serialize;

use crate::entities::{certificate_categories, certificate_providers};

pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, Serialize)]
pub struct Provider {
    pub id: i32,
    pub name: String,
    pub website: Option<String>,
    pub description: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<certificate_providers::Model> for Provider {
    fn from(model: certificate_providers::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            website: model.website,
            description: model.description,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderInput {
    pub name: String,
    pub website: Option<String>,
    pub description: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub icon_class: String,
    pub color: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<certificate_categories::Model> for Category {
    fn from(model: certificate_categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            icon_class: model.icon_class,
            color: model.color,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: String,
    pub icon_class: String,
    pub color: String,
}
