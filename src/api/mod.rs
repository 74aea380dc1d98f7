use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod catalog;
mod certificates;
mod dashboard;
mod employees;
mod error;
mod observability;
mod system;
mod types;
mod users;
mod validation;

pub use auth::CurrentUser;
pub use error::ApiError;
pub use types::*;

use crate::db::Store;
use crate::services::{
    AuthService, CatalogService, CertificateService, DashboardService, UserService,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn user_service(&self) -> &Arc<dyn UserService> {
        &self.shared.user_service
    }

    #[must_use]
    pub fn certificate_service(&self) -> &Arc<dyn CertificateService> {
        &self.shared.certificate_service
    }

    #[must_use]
    pub fn catalog_service(&self) -> &Arc<dyn CatalogService> {
        &self.shared.catalog_service
    }

    #[must_use]
    pub fn dashboard_service(&self) -> &Arc<dyn DashboardService> {
        &self.shared.dashboard_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub fn router(state: Arc<AppState>) -> Router {
    let config = state.config();
    let cors_origins = config.server.cors_allowed_origins.clone();

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.server.secure_cookies)
        .with_http_only(true)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.server.session_inactivity_minutes,
        )));

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/system/health/live", get(system::health_live))
        .route("/system/health/ready", get(system::health_ready))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_credentials(true)
    };

    let slow_threshold_ms = config.server.slow_request_threshold_ms;

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ]))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(
            slow_threshold_ms,
            observability::logging_middleware,
        ))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let upload_limit = DefaultBodyLimit::max(state.config().max_upload_body_bytes());

    let admin_routes = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/{id}", axum::routing::delete(users::delete_user))
        .route("/providers", post(catalog::create_provider))
        .route(
            "/providers/{id}",
            put(catalog::update_provider).delete(catalog::delete_provider),
        )
        .route("/categories", post(catalog::create_category))
        .route(
            "/categories/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn(auth::admin_middleware));

    let upload_routes = Router::new()
        .route(
            "/employees/{id}/photo",
            get(employees::get_photo)
                .put(employees::upload_photo)
                .delete(employees::remove_photo),
        )
        .route(
            "/certificates/{id}/file",
            get(certificates::download_file)
                .put(certificates::upload_file)
                .delete(certificates::remove_file),
        )
        .layer(upload_limit);

    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/password", put(auth::change_password))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/employees", get(employees::list_employees))
        .route(
            "/employees/{id}",
            get(employees::get_employee).put(employees::update_employee),
        )
        .route(
            "/employees/{id}/certificates",
            get(certificates::employee_certificates),
        )
        .route(
            "/certificates",
            get(certificates::overview).post(certificates::create_certificate),
        )
        .route("/certificates/mine", get(certificates::my_certificates))
        .route("/certificates/statistics", get(certificates::statistics))
        .route(
            "/certificates/{id}",
            get(certificates::get_certificate)
                .put(certificates::update_certificate)
                .delete(certificates::delete_certificate),
        )
        .route("/providers", get(catalog::list_providers))
        .route("/categories", get(catalog::list_categories))
        .merge(upload_routes)
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
