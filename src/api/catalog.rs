use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::models::catalog::{Category, Provider};
use crate::services::CatalogError;
use crate::services::catalog_service::{CategoryRequest, ProviderRequest};

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => Self::NotFound(err.to_string()),
            CatalogError::Validation(msg) => Self::ValidationError(msg),
            CatalogError::Conflict(msg) => Self::Conflict(msg),
            CatalogError::InUse { .. } => Self::Conflict(err.to_string()),
            CatalogError::Database(msg) => Self::DatabaseError(msg),
            CatalogError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct ProviderListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct ProviderPayload {
    pub name: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<ProviderPayload> for ProviderRequest {
    fn from(p: ProviderPayload) -> Self {
        Self {
            name: p.name,
            website: p.website,
            description: p.description,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_class: String,
    #[serde(default)]
    pub color: String,
}

impl From<CategoryPayload> for CategoryRequest {
    fn from(p: CategoryPayload) -> Self {
        Self {
            name: p.name,
            description: p.description,
            icon_class: p.icon_class,
            color: p.color,
        }
    }
}

/// GET /providers
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProviderListQuery>,
) -> Result<Json<ApiResponse<Vec<Provider>>>, ApiError> {
    let providers = state
        .catalog_service()
        .list_providers(query.include_inactive)
        .await?;
    Ok(Json(ApiResponse::success(providers)))
}

/// POST /providers
pub async fn create_provider(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProviderPayload>,
) -> Result<(StatusCode, Json<ApiResponse<Provider>>), ApiError> {
    let provider = state.catalog_service().create_provider(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(provider))))
}

/// PUT /providers/{id}
pub async fn update_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<ProviderPayload>,
) -> Result<Json<ApiResponse<Provider>>, ApiError> {
    let id = validate_id(id, "provider")?;
    let provider = state
        .catalog_service()
        .update_provider(id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(provider)))
}

/// DELETE /providers/{id}
pub async fn delete_provider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "provider")?;
    state.catalog_service().delete_provider(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Provider deleted.",
    ))))
}

/// GET /categories
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Category>>>, ApiError> {
    let categories = state.catalog_service().list_categories().await?;
    Ok(Json(ApiResponse::success(categories)))
}

/// POST /categories
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), ApiError> {
    let category = state.catalog_service().create_category(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

/// PUT /categories/{id}
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<ApiResponse<Category>>, ApiError> {
    let id = validate_id(id, "category")?;
    let category = state
        .catalog_service()
        .update_category(id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(category)))
}

/// DELETE /categories/{id}
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "category")?;
    state.catalog_service().delete_category(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Category deleted.",
    ))))
}
