use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, CatalogService, CertificateService, DashboardService, FileStore,
    SeaOrmAuthService, SeaOrmCatalogService, SeaOrmCertificateService, SeaOrmDashboardService,
    SeaOrmUserService, UserService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub files: FileStore,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub certificate_service: Arc<dyn CertificateService>,

    pub catalog_service: Arc<dyn CatalogService>,

    pub dashboard_service: Arc<dyn DashboardService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Ok(Self::with_store(config, store))
    }

    /// Wires every service around an already connected store.
    #[must_use]
    pub fn with_store(config: Config, store: Store) -> Self {
        let files = FileStore::new(&config.uploads.root);

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService + Send + Sync + 'static>;

        let user_service = Arc::new(SeaOrmUserService::new(
            store.clone(),
            config.clone(),
            files.clone(),
        )) as Arc<dyn UserService + Send + Sync + 'static>;

        let certificate_service = Arc::new(SeaOrmCertificateService::new(
            store.clone(),
            config.clone(),
            files.clone(),
        )) as Arc<dyn CertificateService + Send + Sync + 'static>;

        let catalog_service = Arc::new(SeaOrmCatalogService::new(store.clone()))
            as Arc<dyn CatalogService + Send + Sync + 'static>;

        let dashboard_service = Arc::new(SeaOrmDashboardService::new(
            store.clone(),
            config.dashboard.expiring_soon_days,
        )) as Arc<dyn DashboardService + Send + Sync + 'static>;

        Self {
            config: Arc::new(config),
            store,
            files,
            auth_service,
            user_service,
            certificate_service,
            catalog_service,
            dashboard_service,
        }
    }
}
