//! `SeaORM` implementation of the `CertificateService` trait.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::config::Config;
use crate::db::{Scope, SearchFields, Store};
use crate::domain::expiry::today;
use crate::domain::{Actor, CertificateStatus};
use crate::models::certificate::{Certificate, CertificateDraft, CertificateView};
use crate::models::user::{UserSummary, UserWithCounts};
use crate::services::audit;
use crate::services::certificate_service::{
    CertificateDetail, CertificateError, CertificateInput, CertificateOverview,
    CertificateService, CertificateStatistics, EmployeeCertificates, StatisticsScope,
    StatusCount, TopEmployee,
};
use crate::services::fields;
use crate::services::uploads::{FileStore, UploadError, UploadKind, UploadPolicy};
use crate::services::user_service::StoredFile;

const RELATED_LIMIT: u64 = 5;
const TOP_EMPLOYEE_LIMIT: usize = 10;

pub struct SeaOrmCertificateService {
    store: Store,
    config: Config,
    files: FileStore,
}

impl SeaOrmCertificateService {
    #[must_use]
    pub const fn new(store: Store, config: Config, files: FileStore) -> Self {
        Self {
            store,
            config,
            files,
        }
    }

    const fn threshold(&self) -> i64 {
        self.config.dashboard.expiring_soon_days
    }

    async fn require(&self, id: i32) -> Result<Certificate, CertificateError> {
        self.store
            .get_certificate(id)
            .await?
            .ok_or(CertificateError::NotFound)
    }

    fn require_modify(actor: Actor, cert: &Certificate) -> Result<(), CertificateError> {
        if actor.can_modify(cert.user_id) {
            Ok(())
        } else {
            Err(CertificateError::Forbidden(
                "You do not have permission to modify this certificate.".to_string(),
            ))
        }
    }

    async fn view(&self, cert: Certificate) -> Result<CertificateView, CertificateError> {
        self.store
            .certificate_views(vec![cert], today(), self.threshold())
            .await?
            .pop()
            .ok_or(CertificateError::NotFound)
    }

    /// Validates the form and resolves owner, provider and category. The
    /// provider is created only after every other field checks out.
    async fn build_draft(
        &self,
        actor: Actor,
        input: CertificateInput,
        current_owner: Option<i32>,
        today: NaiveDate,
    ) -> Result<CertificateDraft, CertificateError> {
        let name = fields::validate_required(
            &input.name,
            "Certificate name",
            fields::MAX_CERTIFICATE_NAME_LEN,
        )
        .map_err(CertificateError::Validation)?;
        let provider_name =
            fields::validate_provider_name(&input.provider_name).map_err(CertificateError::Validation)?;
        fields::validate_certificate_dates(input.issue_date, input.expiry_date, today)
            .map_err(CertificateError::Validation)?;
        let verification_url =
            fields::validate_http_url(&input.verification_url).map_err(CertificateError::Validation)?;

        let user_id = if actor.is_admin() {
            input
                .user_id
                .or(current_owner)
                .unwrap_or(actor.user_id)
        } else {
            current_owner.unwrap_or(actor.user_id)
        };
        if self.store.get_user(user_id).await?.is_none() {
            return Err(CertificateError::Validation(
                "Select a valid employee.".to_string(),
            ));
        }

        if self.store.get_category(input.category_id).await?.is_none() {
            return Err(CertificateError::Validation(
                "Select a valid category.".to_string(),
            ));
        }

        let provider = self.store.get_or_create_provider(&provider_name).await?;

        Ok(CertificateDraft {
            user_id,
            provider_id: provider.id,
            category_id: input.category_id,
            name,
            certification_id: input.certification_id.trim().to_string(),
            issue_date: input.issue_date,
            expiry_date: input.expiry_date,
            status: input.status,
            verification_url,
            notes: input.notes.trim().to_string(),
        })
    }
}

#[async_trait]
impl CertificateService for SeaOrmCertificateService {
    async fn overview(&self, search: Option<&str>) -> Result<CertificateOverview, CertificateError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let today = today();

        let users = self
            .store
            .list_users(false, search, SearchFields::NameAndEmail)
            .await?;
        let counts = self.store.certificate_counts_by_user().await?;

        let employees: Vec<UserWithCounts> = users
            .into_iter()
            .filter_map(|user| {
                let c = counts.get(&user.id).copied()?;
                (c.total > 0).then_some(UserWithCounts {
                    user,
                    total_certificates: c.total,
                    active_certificates: c.active,
                    expired_certificates: c.expired,
                })
            })
            .collect();

        let mut totals = self.store.certificate_counts(Scope::Company).await?;
        totals.expiring_soon = self
            .store
            .list_expiring_certificates(Scope::Company, today, self.threshold(), None)
            .await?
            .len() as u64;

        Ok(CertificateOverview {
            total_employees: employees.len(),
            search: search.map(str::to_string),
            employees,
            totals,
        })
    }

    async fn for_employee(&self, user_id: i32) -> Result<EmployeeCertificates, CertificateError> {
        let employee = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(CertificateError::EmployeeNotFound)?;
        let today = today();
        let threshold = self.threshold();
        let scope = Scope::User(user_id);

        let certificates = self.store.list_certificates(scope).await?;
        let expiring = self
            .store
            .list_expiring_certificates(scope, today, threshold, None)
            .await?;

        let mut counts = self.store.certificate_counts(scope).await?;
        counts.expiring_soon = expiring.len() as u64;

        Ok(EmployeeCertificates {
            employee,
            certificates: self
                .store
                .certificate_views(certificates, today, threshold)
                .await?,
            counts,
            expiring_soon: self.store.certificate_views(expiring, today, threshold).await?,
        })
    }

    async fn statistics(&self, actor: Actor) -> Result<CertificateStatistics, CertificateError> {
        let is_admin = actor.is_admin();
        let scope = if is_admin {
            Scope::Company
        } else {
            Scope::User(actor.user_id)
        };
        let today = today();
        let threshold = self.threshold();

        let counts = self.store.certificate_counts(scope).await?;
        let by_status = CertificateStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                label: status.label(),
                count: match status {
                    CertificateStatus::Active => counts.active,
                    CertificateStatus::Expired => counts.expired,
                    CertificateStatus::Revoked => counts.revoked,
                },
            })
            .filter(|s| s.count > 0)
            .collect();

        let expiring = self
            .store
            .list_expiring_certificates(scope, today, threshold, None)
            .await?;

        let top_employees = if is_admin {
            let per_user = self.store.certificate_counts_by_user().await?;
            let mut ranked: Vec<(i32, u64)> =
                per_user.iter().map(|(id, c)| (*id, c.total)).collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            ranked.truncate(TOP_EMPLOYEE_LIMIT);

            let ids: Vec<i32> = ranked.iter().map(|(id, _)| *id).collect();
            let users = self.store.get_users_by_ids(&ids).await?;
            Some(
                ranked
                    .into_iter()
                    .filter_map(|(id, count)| {
                        users.iter().find(|u| u.id == id).map(|u| TopEmployee {
                            employee: UserSummary::from(u),
                            certificate_count: count,
                        })
                    })
                    .collect(),
            )
        } else {
            None
        };

        Ok(CertificateStatistics {
            scope: if is_admin {
                StatisticsScope::Company
            } else {
                StatisticsScope::Own
            },
            total_certificates: counts.total,
            by_provider: self.store.certificate_counts_by_provider(scope).await?,
            by_category: self.store.certificate_counts_by_category(scope).await?,
            by_status,
            expiring_soon: self.store.certificate_views(expiring, today, threshold).await?,
            top_employees,
        })
    }

    async fn detail(&self, actor: Actor, id: i32) -> Result<CertificateDetail, CertificateError> {
        let cert = self.require(id).await?;
        let related = self
            .store
            .list_related_certificates(cert.provider_id, cert.id, RELATED_LIMIT)
            .await?;
        let can_edit = actor.can_modify(cert.user_id);

        Ok(CertificateDetail {
            certificate: self.view(cert).await?,
            can_edit,
            related: self
                .store
                .certificate_views(related, today(), self.threshold())
                .await?,
        })
    }

    async fn create(
        &self,
        actor: Actor,
        input: CertificateInput,
    ) -> Result<CertificateView, CertificateError> {
        let today = today();
        let draft = self.build_draft(actor, input, None, today).await?;
        let cert = self.store.create_certificate(draft, today).await?;

        audit::certificate_changed("certificate_created", actor.user_id, cert.id, cert.user_id);

        self.view(cert).await
    }

    async fn update(
        &self,
        actor: Actor,
        id: i32,
        input: CertificateInput,
    ) -> Result<CertificateView, CertificateError> {
        let existing = self.require(id).await?;
        Self::require_modify(actor, &existing)?;

        let today = today();
        let draft = self
            .build_draft(actor, input, Some(existing.user_id), today)
            .await?;
        let cert = self
            .store
            .update_certificate(id, draft, today)
            .await?
            .ok_or(CertificateError::NotFound)?;

        audit::certificate_changed("certificate_updated", actor.user_id, cert.id, cert.user_id);

        self.view(cert).await
    }

    async fn delete(&self, actor: Actor, id: i32) -> Result<(), CertificateError> {
        let cert = self.require(id).await?;
        Self::require_modify(actor, &cert)?;

        if !self.store.delete_certificate(id).await? {
            return Err(CertificateError::NotFound);
        }
        if let Some(path) = &cert.certificate_file {
            self.files.remove(path).await;
        }

        audit::certificate_changed("certificate_deleted", actor.user_id, cert.id, cert.user_id);

        Ok(())
    }

    async fn attach_file(
        &self,
        actor: Actor,
        id: i32,
        filename: &str,
        data: &[u8],
    ) -> Result<CertificateView, CertificateError> {
        let cert = self.require(id).await?;
        Self::require_modify(actor, &cert)?;

        let upload = UploadPolicy::document(&self.config.uploads).validate(filename, data)?;
        let path = self
            .files
            .save(UploadKind::CertificateFile, &upload.filename, data)
            .await?;

        if let Err(e) = self.store.set_certificate_file(id, Some(path.clone())).await {
            self.files.remove(&path).await;
            return Err(e.into());
        }
        if let Some(old) = &cert.certificate_file {
            self.files.remove(old).await;
        }

        audit::file_uploaded(actor.user_id, "certificate_file", &path, data.len());

        let cert = self.require(id).await?;
        self.view(cert).await
    }

    async fn remove_file(&self, actor: Actor, id: i32) -> Result<CertificateView, CertificateError> {
        let cert = self.require(id).await?;
        Self::require_modify(actor, &cert)?;

        if let Some(old) = &cert.certificate_file {
            self.store.set_certificate_file(id, None).await?;
            self.files.remove(old).await;
        }

        let cert = self.require(id).await?;
        self.view(cert).await
    }

    async fn file(&self, id: i32) -> Result<StoredFile, CertificateError> {
        let cert = self.require(id).await?;
        let path = cert
            .certificate_file
            .ok_or(CertificateError::Upload(UploadError::NotFound))?;

        let bytes = self.files.read(&path).await?;
        Ok(StoredFile {
            content_type: mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string(),
            filename: path.rsplit('/').next().unwrap_or(&path).to_string(),
            bytes,
        })
    }

    async fn expire_overdue(&self, today: NaiveDate) -> Result<u64, CertificateError> {
        Ok(self.store.expire_overdue_certificates(today).await?)
    }
}
