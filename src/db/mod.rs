use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::Role;
use crate::models::catalog::{Category, CategoryInput, Provider, ProviderInput};
use crate::models::certificate::{
    Certificate, CertificateCounts, CertificateDraft, CertificateRecord, CertificateView,
    NamedCount,
};
use crate::models::user::{NewUser, User, UserChanges};

pub mod migrator;
pub mod repositories;

pub use repositories::certificate::Scope;
pub use repositories::stats::CategoryCount;
pub use repositories::user::{SearchFields, hash_password};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn provider_repo(&self) -> repositories::provider::ProviderRepository {
        repositories::provider::ProviderRepository::new(self.conn.clone())
    }

    fn category_repo(&self) -> repositories::category::CategoryRepository {
        repositories::category::CategoryRepository::new(self.conn.clone())
    }

    fn certificate_repo(&self) -> repositories::certificate::CertificateRepository {
        repositories::certificate::CertificateRepository::new(self.conn.clone())
    }

    fn stats_repo(&self) -> repositories::stats::StatsRepository {
        repositories::stats::StatsRepository::new(self.conn.clone())
    }

    // Users

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get(id).await
    }

    pub async fn get_users_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
        self.user_repo().get_by_ids(ids).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        self.user_repo().email_exists(email).await
    }

    pub async fn verify_user_password(&self, user_id: i32, password: &str) -> Result<bool> {
        self.user_repo().verify_password(user_id, password).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.user_repo().create(new_user).await
    }

    pub async fn update_user(&self, id: i32, changes: UserChanges) -> Result<Option<User>> {
        self.user_repo().update(id, changes).await
    }

    pub async fn set_user_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        self.user_repo().set_password_hash(id, password_hash).await
    }

    pub async fn set_profile_image(&self, id: i32, path: Option<String>) -> Result<()> {
        self.user_repo().set_profile_image(id, path).await
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        self.user_repo().touch_last_login(id).await
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn list_users(
        &self,
        active_only: bool,
        search: Option<&str>,
        fields: SearchFields,
    ) -> Result<Vec<User>> {
        self.user_repo().list(active_only, search, fields).await
    }

    pub async fn count_active_users(&self) -> Result<u64> {
        self.user_repo().count_active().await
    }

    pub async fn count_users_by_role(&self, role: Role) -> Result<u64> {
        self.user_repo().count_by_role(role).await
    }

    // Providers

    pub async fn list_providers(&self, include_inactive: bool) -> Result<Vec<Provider>> {
        self.provider_repo().list(include_inactive).await
    }

    pub async fn get_provider(&self, id: i32) -> Result<Option<Provider>> {
        self.provider_repo().get(id).await
    }

    pub async fn find_provider_by_name(&self, name: &str) -> Result<Option<Provider>> {
        self.provider_repo().find_by_name(name).await
    }

    pub async fn get_or_create_provider(&self, name: &str) -> Result<Provider> {
        self.provider_repo().get_or_create(name).await
    }

    pub async fn create_provider(&self, input: ProviderInput) -> Result<Provider> {
        self.provider_repo().create(input).await
    }

    pub async fn update_provider(&self, id: i32, input: ProviderInput) -> Result<Option<Provider>> {
        self.provider_repo().update(id, input).await
    }

    pub async fn delete_provider(&self, id: i32) -> Result<bool> {
        self.provider_repo().delete(id).await
    }

    pub async fn provider_certificate_count(&self, id: i32) -> Result<u64> {
        self.provider_repo().certificate_count(id).await
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.category_repo().list().await
    }

    pub async fn get_category(&self, id: i32) -> Result<Option<Category>> {
        self.category_repo().get(id).await
    }

    pub async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.category_repo().find_by_name(name).await
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category> {
        self.category_repo().create(input).await
    }

    pub async fn update_category(&self, id: i32, input: CategoryInput) -> Result<Option<Category>> {
        self.category_repo().update(id, input).await
    }

    pub async fn delete_category(&self, id: i32) -> Result<bool> {
        self.category_repo().delete(id).await
    }

    pub async fn category_certificate_count(&self, id: i32) -> Result<u64> {
        self.category_repo().certificate_count(id).await
    }

    // Certificates

    pub async fn get_certificate(&self, id: i32) -> Result<Option<Certificate>> {
        self.certificate_repo().get(id).await
    }

    pub async fn create_certificate(
        &self,
        draft: CertificateDraft,
        today: NaiveDate,
    ) -> Result<Certificate> {
        self.certificate_repo().create(draft, today).await
    }

    pub async fn update_certificate(
        &self,
        id: i32,
        draft: CertificateDraft,
        today: NaiveDate,
    ) -> Result<Option<Certificate>> {
        self.certificate_repo().update(id, draft, today).await
    }

    pub async fn set_certificate_file(&self, id: i32, path: Option<String>) -> Result<()> {
        self.certificate_repo().set_file(id, path).await
    }

    pub async fn delete_certificate(&self, id: i32) -> Result<bool> {
        self.certificate_repo().delete(id).await
    }

    pub async fn list_certificates(&self, scope: Scope) -> Result<Vec<Certificate>> {
        self.certificate_repo().list(scope).await
    }

    pub async fn list_recent_certificates(
        &self,
        scope: Scope,
        limit: u64,
    ) -> Result<Vec<Certificate>> {
        self.certificate_repo().list_recent(scope, limit).await
    }

    pub async fn list_related_certificates(
        &self,
        provider_id: i32,
        exclude_id: i32,
        limit: u64,
    ) -> Result<Vec<Certificate>> {
        self.certificate_repo()
            .list_related(provider_id, exclude_id, limit)
            .await
    }

    pub async fn list_expiring_certificates(
        &self,
        scope: Scope,
        today: NaiveDate,
        threshold_days: i64,
        limit: Option<u64>,
    ) -> Result<Vec<Certificate>> {
        self.certificate_repo()
            .list_expiring(scope, today, threshold_days, limit)
            .await
    }

    pub async fn list_issue_dates_since(&self, since: NaiveDate) -> Result<Vec<NaiveDate>> {
        self.certificate_repo().list_issued_since(since).await
    }

    pub async fn certificate_file_paths_for_user(&self, user_id: i32) -> Result<Vec<String>> {
        self.certificate_repo().file_paths_for_user(user_id).await
    }

    pub async fn expire_overdue_certificates(&self, today: NaiveDate) -> Result<u64> {
        self.certificate_repo().expire_overdue(today).await
    }

    pub async fn hydrate_certificates(
        &self,
        certs: Vec<Certificate>,
    ) -> Result<Vec<CertificateRecord>> {
        self.certificate_repo().hydrate(certs).await
    }

    /// Hydrates `certs` and renders them with their expiry fields.
    pub async fn certificate_views(
        &self,
        certs: Vec<Certificate>,
        today: NaiveDate,
        threshold_days: i64,
    ) -> Result<Vec<CertificateView>> {
        Ok(self
            .hydrate_certificates(certs)
            .await?
            .iter()
            .map(|record| record.view(today, threshold_days))
            .collect())
    }

    // Aggregates

    pub async fn certificate_counts(&self, scope: Scope) -> Result<CertificateCounts> {
        self.stats_repo().counts_by_status(scope).await
    }

    pub async fn certificate_counts_by_user(&self) -> Result<HashMap<i32, CertificateCounts>> {
        self.stats_repo().counts_by_user().await
    }

    pub async fn certificate_counts_by_provider(&self, scope: Scope) -> Result<Vec<NamedCount>> {
        self.stats_repo().counts_by_provider(scope).await
    }

    pub async fn certificate_counts_by_category(
        &self,
        scope: Scope,
    ) -> Result<Vec<CategoryCount>> {
        self.stats_repo().counts_by_category(scope).await
    }
}
