use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, CurrentUser, MessageResponse};
use crate::domain::Role;
use crate::services::user_service::{CreateUserRequest, CreatedUser};

const fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct NewUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// POST /users
///
/// The temporary password is only ever returned here.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(payload): Json<NewUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedUser>>), ApiError> {
    let created = state
        .user_service()
        .create_user(
            current.actor(),
            CreateUserRequest {
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
                department: payload.department,
                position: payload.position,
                role: payload.role,
                is_active: payload.is_active,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "user")?;
    let user = state.user_service().delete_user(current.actor(), id).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(format!(
        "User \"{}\" has been deleted.",
        user.full_name()
    )))))
}
