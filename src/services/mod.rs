pub mod audit;
pub mod fields;
pub mod passwords;
pub mod uploads;

pub use uploads::{FileStore, UploadError};

pub mod scheduler;
pub use scheduler::Scheduler;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UserError, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod certificate_service;
pub mod certificate_service_impl;
pub use certificate_service::{CertificateError, CertificateService};
pub use certificate_service_impl::SeaOrmCertificateService;

pub mod catalog_service;
pub mod catalog_service_impl;
pub use catalog_service::{CatalogError, CatalogService};
pub use catalog_service_impl::SeaOrmCatalogService;

pub mod dashboard_service;
pub mod dashboard_service_impl;
pub use dashboard_service::{DashboardError, DashboardService};
pub use dashboard_service_impl::SeaOrmDashboardService;
