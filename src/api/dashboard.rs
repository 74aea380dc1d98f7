use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::services::DashboardError;
use crate::services::dashboard_service::Dashboard;

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Database(msg) => Self::DatabaseError(msg),
            DashboardError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

/// GET /dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Dashboard>>, ApiError> {
    let dashboard = state.dashboard_service().dashboard().await?;
    Ok(Json(ApiResponse::success(dashboard)))
}
