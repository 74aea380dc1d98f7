use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{normalize_search, read_file_field, validate_id};
use super::{ApiError, ApiResponse, AppState, CurrentUser, SearchQuery};
use crate::domain::Role;
use crate::models::user::User;
use crate::services::UserError;
use crate::services::user_service::{
    EmployeeDirectory, EmployeeProfile, ProfileUpdate, StoredFile,
};

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => Self::NotFound(err.to_string()),
            UserError::Forbidden(msg) => Self::Forbidden(msg),
            UserError::Validation(msg) => Self::ValidationError(msg),
            UserError::Conflict(msg) => Self::Conflict(msg),
            UserError::Deletion(denied) => denied.into(),
            UserError::Upload(upload) => upload.into(),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmployeeRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl From<UpdateEmployeeRequest> for ProfileUpdate {
    fn from(req: UpdateEmployeeRequest) -> Self {
        Self {
            first_name: req.first_name,
            last_name: req.last_name,
            department: req.department,
            position: req.position,
            role: req.role,
            is_active: req.is_active,
        }
    }
}

/// Serves a stored upload inline with its guessed content type.
pub(super) fn file_response(file: StoredFile) -> Response {
    (
        [
            (header::CONTENT_TYPE, file.content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", file.filename.replace('"', "")),
            ),
        ],
        Body::from(file.bytes),
    )
        .into_response()
}

/// GET /employees
pub async fn list_employees(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<EmployeeDirectory>>, ApiError> {
    let directory = state
        .user_service()
        .list_employees(normalize_search(query.search.as_deref()))
        .await?;
    Ok(Json(ApiResponse::success(directory)))
}

/// GET /employees/{id}
pub async fn get_employee(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EmployeeProfile>>, ApiError> {
    let id = validate_id(id, "employee")?;
    let profile = state.user_service().get_profile(current.actor(), id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PUT /employees/{id}
pub async fn update_employee(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let id = validate_id(id, "employee")?;
    let user = state
        .user_service()
        .update_profile(current.actor(), id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /employees/{id}/photo
pub async fn upload_photo(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let id = validate_id(id, "employee")?;
    let (filename, data) = read_file_field(multipart).await?;
    let user = state
        .user_service()
        .set_photo(current.actor(), id, &filename, &data)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /employees/{id}/photo
pub async fn remove_photo(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let id = validate_id(id, "employee")?;
    let user = state.user_service().remove_photo(current.actor(), id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// GET /employees/{id}/photo
pub async fn get_photo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let id = validate_id(id, "employee")?;
    let file = state.user_service().photo(id).await?;
    Ok(file_response(file))
}
