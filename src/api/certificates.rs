use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;

use super::employees::file_response;
use super::validation::{normalize_search, read_file_field, validate_id};
use super::{ApiError, ApiResponse, AppState, CurrentUser, MessageResponse, SearchQuery};
use crate::domain::CertificateStatus;
use crate::models::certificate::CertificateView;
use crate::services::CertificateError;
use crate::services::certificate_service::{
    CertificateDetail, CertificateInput, CertificateOverview, CertificateStatistics,
    EmployeeCertificates,
};

impl From<CertificateError> for ApiError {
    fn from(err: CertificateError) -> Self {
        match err {
            CertificateError::NotFound | CertificateError::EmployeeNotFound => {
                Self::NotFound(err.to_string())
            }
            CertificateError::Forbidden(msg) => Self::Forbidden(msg),
            CertificateError::Validation(msg) => Self::ValidationError(msg),
            CertificateError::Upload(upload) => upload.into(),
            CertificateError::Database(msg) => Self::DatabaseError(msg),
            CertificateError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CertificateRequest {
    #[serde(default)]
    pub user_id: Option<i32>,
    pub name: String,
    #[serde(default)]
    pub certification_id: String,
    pub provider_name: String,
    pub category_id: i32,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: CertificateStatus,
    #[serde(default)]
    pub verification_url: String,
    #[serde(default)]
    pub notes: String,
}

impl From<CertificateRequest> for CertificateInput {
    fn from(req: CertificateRequest) -> Self {
        Self {
            user_id: req.user_id,
            name: req.name,
            certification_id: req.certification_id,
            provider_name: req.provider_name,
            category_id: req.category_id,
            issue_date: req.issue_date,
            expiry_date: req.expiry_date,
            status: req.status,
            verification_url: req.verification_url,
            notes: req.notes,
        }
    }
}

/// GET /certificates
pub async fn overview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<CertificateOverview>>, ApiError> {
    let overview = state
        .certificate_service()
        .overview(normalize_search(query.search.as_deref()))
        .await?;
    Ok(Json(ApiResponse::success(overview)))
}

/// GET /certificates/mine
pub async fn my_certificates(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ApiResponse<EmployeeCertificates>>, ApiError> {
    let certificates = state.certificate_service().for_employee(user.id).await?;
    Ok(Json(ApiResponse::success(certificates)))
}

/// GET /employees/{id}/certificates
pub async fn employee_certificates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EmployeeCertificates>>, ApiError> {
    let id = validate_id(id, "employee")?;
    let certificates = state.certificate_service().for_employee(id).await?;
    Ok(Json(ApiResponse::success(certificates)))
}

/// GET /certificates/statistics
pub async fn statistics(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<CertificateStatistics>>, ApiError> {
    let stats = state
        .certificate_service()
        .statistics(current.actor())
        .await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /certificates/{id}
pub async fn get_certificate(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CertificateDetail>>, ApiError> {
    let id = validate_id(id, "certificate")?;
    let detail = state
        .certificate_service()
        .detail(current.actor(), id)
        .await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// POST /certificates
pub async fn create_certificate(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Json(payload): Json<CertificateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CertificateView>>), ApiError> {
    let certificate = state
        .certificate_service()
        .create(current.actor(), payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(certificate))))
}

/// PUT /certificates/{id}
pub async fn update_certificate(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<CertificateRequest>,
) -> Result<Json<ApiResponse<CertificateView>>, ApiError> {
    let id = validate_id(id, "certificate")?;
    let certificate = state
        .certificate_service()
        .update(current.actor(), id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(certificate)))
}

/// DELETE /certificates/{id}
pub async fn delete_certificate(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "certificate")?;
    state
        .certificate_service()
        .delete(current.actor(), id)
        .await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Certificate deleted.",
    ))))
}

/// PUT /certificates/{id}/file
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<CertificateView>>, ApiError> {
    let id = validate_id(id, "certificate")?;
    let (filename, data) = read_file_field(multipart).await?;
    let certificate = state
        .certificate_service()
        .attach_file(current.actor(), id, &filename, &data)
        .await?;
    Ok(Json(ApiResponse::success(certificate)))
}

/// DELETE /certificates/{id}/file
pub async fn remove_file(
    State(state): State<Arc<AppState>>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<CertificateView>>, ApiError> {
    let id = validate_id(id, "certificate")?;
    let certificate = state
        .certificate_service()
        .remove_file(current.actor(), id)
        .await?;
    Ok(Json(ApiResponse::success(certificate)))
}

/// GET /certificates/{id}/file
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let id = validate_id(id, "certificate")?;
    let file = state.certificate_service().file(id).await?;
    Ok(file_response(file))
}
