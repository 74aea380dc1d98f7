use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Select, Set,
};

use crate::domain::{CertificateStatus, effective_status};
use crate::entities::{certificate_categories, certificate_providers, certificates, users};
use crate::models::catalog::{Category, Provider};
use crate::models::certificate::{Certificate, CertificateDraft, CertificateRecord};
use crate::models::user::User;

/// Restricts a certificate query to one owner, or the whole company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Company,
    User(i32),
}

impl Scope {
    fn apply(self, query: Select<certificates::Entity>) -> Select<certificates::Entity> {
        query.apply_if(self.user_id(), |q, id| {
            q.filter(certificates::Column::UserId.eq(id))
        })
    }

    #[must_use]
    pub const fn user_id(self) -> Option<i32> {
        match self {
            Self::Company => None,
            Self::User(id) => Some(id),
        }
    }
}

pub struct CertificateRepository {
    conn: DatabaseConnection,
}

impl CertificateRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<Certificate>> {
        let row = certificates::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query certificate")?;

        row.map(Certificate::try_from).transpose()
    }

    /// Inserts a certificate. The stored status follows the expiry date.
    pub async fn create(&self, draft: CertificateDraft, today: NaiveDate) -> Result<Certificate> {
        let now = chrono::Utc::now().to_rfc3339();
        let status = effective_status(draft.status, draft.expiry_date, today);

        let active = certificates::ActiveModel {
            user_id: Set(draft.user_id),
            provider_id: Set(draft.provider_id),
            category_id: Set(draft.category_id),
            name: Set(draft.name),
            certification_id: Set(draft.certification_id),
            issue_date: Set(draft.issue_date),
            expiry_date: Set(draft.expiry_date),
            status: Set(status.as_str().to_string()),
            certificate_file: Set(None),
            verification_url: Set(draft.verification_url),
            notes: Set(draft.notes),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert certificate")?;

        Certificate::try_from(model)
    }

    pub async fn update(
        &self,
        id: i32,
        draft: CertificateDraft,
        today: NaiveDate,
    ) -> Result<Option<Certificate>> {
        let Some(model) = certificates::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let status = effective_status(draft.status, draft.expiry_date, today);

        let mut active: certificates::ActiveModel = model.into();
        active.user_id = Set(draft.user_id);
        active.provider_id = Set(draft.provider_id);
        active.category_id = Set(draft.category_id);
        active.name = Set(draft.name);
        active.certification_id = Set(draft.certification_id);
        active.issue_date = Set(draft.issue_date);
        active.expiry_date = Set(draft.expiry_date);
        active.status = Set(status.as_str().to_string());
        active.verification_url = Set(draft.verification_url);
        active.notes = Set(draft.notes);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update certificate")?;

        Certificate::try_from(model).map(Some)
    }

    pub async fn set_file(&self, id: i32, path: Option<String>) -> Result<()> {
        let model = certificates::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Certificate not found: {id}"))?;

        let mut active: certificates::ActiveModel = model.into();
        active.certificate_file = Set(path);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = certificates::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete certificate")?;

        Ok(result.rows_affected > 0)
    }

    /// Certificates in scope, newest issue date first.
    pub async fn list(&self, scope: Scope) -> Result<Vec<Certificate>> {
        scope
            .apply(certificates::Entity::find())
            .order_by_desc(certificates::Column::IssueDate)
            .order_by_desc(certificates::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list certificates")?
            .into_iter()
            .map(Certificate::try_from)
            .collect()
    }

    pub async fn list_recent(&self, scope: Scope, limit: u64) -> Result<Vec<Certificate>> {
        scope
            .apply(certificates::Entity::find())
            .order_by_desc(certificates::Column::IssueDate)
            .order_by_desc(certificates::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list recent certificates")?
            .into_iter()
            .map(Certificate::try_from)
            .collect()
    }

    /// Other certificates from the same provider.
    pub async fn list_related(
        &self,
        provider_id: i32,
        exclude_id: i32,
        limit: u64,
    ) -> Result<Vec<Certificate>> {
        certificates::Entity::find()
            .filter(certificates::Column::ProviderId.eq(provider_id))
            .filter(certificates::Column::Id.ne(exclude_id))
            .order_by_desc(certificates::Column::IssueDate)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list related certificates")?
            .into_iter()
            .map(Certificate::try_from)
            .collect()
    }

    /// Active certificates expiring within `threshold_days` after `today`,
    /// soonest first.
    pub async fn list_expiring(
        &self,
        scope: Scope,
        today: NaiveDate,
        threshold_days: i64,
        limit: Option<u64>,
    ) -> Result<Vec<Certificate>> {
        let horizon = today + chrono::Duration::days(threshold_days);

        scope
            .apply(certificates::Entity::find())
            .filter(certificates::Column::Status.eq(CertificateStatus::Active.as_str()))
            .filter(certificates::Column::ExpiryDate.gt(today))
            .filter(certificates::Column::ExpiryDate.lte(horizon))
            .order_by_asc(certificates::Column::ExpiryDate)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list expiring certificates")?
            .into_iter()
            .map(Certificate::try_from)
            .collect()
    }

    pub async fn list_issued_since(&self, since: NaiveDate) -> Result<Vec<NaiveDate>> {
        let rows = certificates::Entity::find()
            .filter(certificates::Column::IssueDate.gte(since))
            .order_by_asc(certificates::Column::IssueDate)
            .all(&self.conn)
            .await
            .context("Failed to list certificate issue dates")?;

        Ok(rows.into_iter().map(|row| row.issue_date).collect())
    }

    /// Stored file paths of every certificate owned by `user_id`.
    pub async fn file_paths_for_user(&self, user_id: i32) -> Result<Vec<String>> {
        let rows = certificates::Entity::find()
            .filter(certificates::Column::UserId.eq(user_id))
            .filter(certificates::Column::CertificateFile.is_not_null())
            .all(&self.conn)
            .await
            .context("Failed to list certificate files")?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row.certificate_file)
            .collect())
    }

    /// Flips every `ACTIVE` certificate whose expiry date is before `today`
    /// to `EXPIRED` in a single statement.
    pub async fn expire_overdue(&self, today: NaiveDate) -> Result<u64> {
        let result = certificates::Entity::update_many()
            .col_expr(
                certificates::Column::Status,
                Expr::value(CertificateStatus::Expired.as_str()),
            )
            .col_expr(
                certificates::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(certificates::Column::Status.eq(CertificateStatus::Active.as_str()))
            .filter(certificates::Column::ExpiryDate.is_not_null())
            .filter(certificates::Column::ExpiryDate.lt(today))
            .exec(&self.conn)
            .await
            .context("Failed to expire overdue certificates")?;

        Ok(result.rows_affected)
    }

    /// Joins owners, providers and categories onto `certs`, preserving order.
    /// Rows whose parents vanished concurrently are skipped.
    pub async fn hydrate(&self, certs: Vec<Certificate>) -> Result<Vec<CertificateRecord>> {
        if certs.is_empty() {
            return Ok(Vec::new());
        }

        let mut user_ids: Vec<i32> = certs.iter().map(|c| c.user_id).collect();
        let mut provider_ids: Vec<i32> = certs.iter().map(|c| c.provider_id).collect();
        let mut category_ids: Vec<i32> = certs.iter().map(|c| c.category_id).collect();
        for ids in [&mut user_ids, &mut provider_ids, &mut category_ids] {
            ids.sort_unstable();
            ids.dedup();
        }

        let owners: HashMap<i32, User> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.conn)
            .await
            .context("Failed to load certificate owners")?
            .into_iter()
            .map(|m| User::try_from(m).map(|u| (u.id, u)))
            .collect::<Result<_>>()?;

        let providers: HashMap<i32, Provider> = certificate_providers::Entity::find()
            .filter(certificate_providers::Column::Id.is_in(provider_ids))
            .all(&self.conn)
            .await
            .context("Failed to load certificate providers")?
            .into_iter()
            .map(|m| (m.id, Provider::from(m)))
            .collect();

        let categories: HashMap<i32, Category> = certificate_categories::Entity::find()
            .filter(certificate_categories::Column::Id.is_in(category_ids))
            .all(&self.conn)
            .await
            .context("Failed to load certificate categories")?
            .into_iter()
            .map(|m| (m.id, Category::from(m)))
            .collect();

        Ok(certs
            .into_iter()
            .filter_map(|certificate| {
                let owner = owners.get(&certificate.user_id)?.clone();
                let provider = providers.get(&certificate.provider_id)?.clone();
                let category = categories.get(&certificate.category_id)?.clone();
                Some(CertificateRecord {
                    certificate,
                    owner,
                    provider,
                    category,
                })
            })
            .collect())
    }
}
