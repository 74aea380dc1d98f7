//! `SeaORM` implementation of the `UserService` trait.

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

use crate::config::Config;
use crate::db::{Scope, SearchFields, Store, hash_password};
use crate::domain::expiry::today;
use crate::domain::{Actor, Role};
use crate::models::user::{NewUser, User, UserChanges, UserWithCounts};
use crate::services::audit;
use crate::services::fields;
use crate::services::passwords::generate_temporary_password;
use crate::services::uploads::{FileStore, UploadError, UploadKind, UploadPolicy};
use crate::services::user_service::{
    CreateUserRequest, CreatedUser, EmployeeDirectory, EmployeeProfile, ProfileUpdate,
    StoredFile, UserError, UserService,
};

const RECENT_LIMIT: u64 = 5;
const TOP_PROVIDER_LIMIT: usize = 5;

pub struct SeaOrmUserService {
    store: Store,
    config: Config,
    files: FileStore,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, config: Config, files: FileStore) -> Self {
        Self {
            store,
            config,
            files,
        }
    }

    async fn require_user(&self, user_id: i32) -> Result<User, UserError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or(UserError::NotFound)
    }

    fn require_profile_access(actor: Actor, user_id: i32) -> Result<(), UserError> {
        if actor.can_edit_profile(user_id) {
            Ok(())
        } else {
            Err(UserError::Forbidden(
                "You do not have permission to edit this profile.".to_string(),
            ))
        }
    }

    fn validate_changes(
        actor: Actor,
        target: &User,
        update: ProfileUpdate,
    ) -> Result<UserChanges, UserError> {
        let privileged = update.role.is_some() || update.is_active.is_some();
        if privileged && !actor.is_admin() {
            return Err(UserError::Forbidden(
                "Only administrators can change user roles.".to_string(),
            ));
        }

        if actor.user_id == target.id {
            if update.role.is_some_and(|role| role != target.role) {
                return Err(UserError::Validation(
                    "You cannot change your own role.".to_string(),
                ));
            }
            if update.is_active == Some(false) {
                return Err(UserError::Validation(
                    "You cannot deactivate your own account.".to_string(),
                ));
            }
        }

        Ok(UserChanges {
            first_name: update
                .first_name
                .map(|v| fields::normalize_person_name(&v, "First name"))
                .transpose()
                .map_err(UserError::Validation)?,
            last_name: update
                .last_name
                .map(|v| fields::normalize_person_name(&v, "Last name"))
                .transpose()
                .map_err(UserError::Validation)?,
            department: update.department.map(|v| fields::normalize_org_field(&v)),
            position: update.position.map(|v| fields::normalize_org_field(&v)),
            role: update.role,
            is_active: update.is_active,
        })
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list_employees(&self, search: Option<&str>) -> Result<EmployeeDirectory, UserError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let users = self
            .store
            .list_users(true, search, SearchFields::Profile)
            .await?;
        let counts = self.store.certificate_counts_by_user().await?;

        let employees: Vec<UserWithCounts> = users
            .into_iter()
            .map(|user| {
                let c = counts.get(&user.id).copied().unwrap_or_default();
                UserWithCounts {
                    user,
                    total_certificates: c.total,
                    active_certificates: c.active,
                    expired_certificates: c.expired,
                }
            })
            .collect();

        Ok(EmployeeDirectory {
            total_employees: employees.len(),
            total_admins: employees
                .iter()
                .filter(|e| e.user.role == Role::Admin)
                .count(),
            total_employee_role: employees
                .iter()
                .filter(|e| e.user.role == Role::Employee)
                .count(),
            employees_with_certificates: employees
                .iter()
                .filter(|e| e.total_certificates > 0)
                .count(),
            search: search.map(str::to_string),
            employees,
        })
    }

    async fn get_profile(&self, actor: Actor, user_id: i32) -> Result<EmployeeProfile, UserError> {
        let user = self.require_user(user_id).await?;
        let today = today();
        let threshold = self.config.dashboard.expiring_soon_days;
        let scope = Scope::User(user_id);

        let mut counts = self.store.certificate_counts(scope).await?;
        let expiring = self
            .store
            .list_expiring_certificates(scope, today, threshold, None)
            .await?;
        counts.expiring_soon = expiring.len() as u64;

        let recent = self.store.list_recent_certificates(scope, RECENT_LIMIT).await?;
        let mut top_providers = self.store.certificate_counts_by_provider(scope).await?;
        top_providers.truncate(TOP_PROVIDER_LIMIT);

        Ok(EmployeeProfile {
            can_edit: actor.can_edit_profile(user.id),
            user,
            counts,
            expiring_soon: self
                .store
                .certificate_views(expiring, today, threshold)
                .await?,
            recent_certificates: self.store.certificate_views(recent, today, threshold).await?,
            top_providers,
        })
    }

    async fn update_profile(
        &self,
        actor: Actor,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<User, UserError> {
        Self::require_profile_access(actor, user_id)?;
        let target = self.require_user(user_id).await?;
        let changes = Self::validate_changes(actor, &target, update)?;
        let new_role = changes.role;

        let updated = self
            .store
            .update_user(user_id, changes)
            .await?
            .ok_or(UserError::NotFound)?;

        if let Some(role) = new_role
            && role != target.role
        {
            audit::role_changed(actor.user_id, user_id, target.role.as_str(), role.as_str());
        }
        audit::user_updated(actor.user_id, user_id);

        Ok(updated)
    }

    async fn set_photo(
        &self,
        actor: Actor,
        user_id: i32,
        filename: &str,
        data: &[u8],
    ) -> Result<User, UserError> {
        Self::require_profile_access(actor, user_id)?;
        let user = self.require_user(user_id).await?;

        let upload = UploadPolicy::image(&self.config.uploads).validate(filename, data)?;
        let path = self
            .files
            .save(UploadKind::ProfileImage, &upload.filename, data)
            .await?;

        if let Err(e) = self.store.set_profile_image(user_id, Some(path.clone())).await {
            self.files.remove(&path).await;
            return Err(e.into());
        }

        if let Some(old) = user.profile_image {
            self.files.remove(&old).await;
        }

        audit::file_uploaded(actor.user_id, "profile_image", &path, data.len());

        self.require_user(user_id).await
    }

    async fn remove_photo(&self, actor: Actor, user_id: i32) -> Result<User, UserError> {
        Self::require_profile_access(actor, user_id)?;
        let user = self.require_user(user_id).await?;

        if let Some(old) = user.profile_image {
            self.store.set_profile_image(user_id, None).await?;
            self.files.remove(&old).await;
        }

        self.require_user(user_id).await
    }

    async fn photo(&self, user_id: i32) -> Result<StoredFile, UserError> {
        let user = self.require_user(user_id).await?;
        let path = user
            .profile_image
            .ok_or(UserError::Upload(UploadError::NotFound))?;

        let bytes = self.files.read(&path).await?;
        Ok(StoredFile {
            content_type: mime_guess::from_path(&path)
                .first_or_octet_stream()
                .to_string(),
            filename: path.rsplit('/').next().unwrap_or(&path).to_string(),
            bytes,
        })
    }

    async fn create_user(
        &self,
        actor: Actor,
        request: CreateUserRequest,
    ) -> Result<CreatedUser, UserError> {
        if !actor.is_admin() {
            return Err(UserError::Forbidden(
                "Admin privileges are required.".to_string(),
            ));
        }

        let email = fields::normalize_email(&request.email).map_err(UserError::Validation)?;
        if self.store.email_exists(&email).await? {
            return Err(UserError::Conflict(format!(
                "A user with the email \"{email}\" already exists."
            )));
        }

        let first_name = fields::normalize_person_name(&request.first_name, "First name")
            .map_err(UserError::Validation)?;
        let last_name = fields::normalize_person_name(&request.last_name, "Last name")
            .map_err(UserError::Validation)?;

        let temporary_password =
            generate_temporary_password(self.config.security.temporary_password_length);

        let password = temporary_password.clone();
        let security = self.config.security.clone();
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password, Some(&security)))
                .await
                .context("Password hashing task panicked")??;

        let user = self
            .store
            .create_user(NewUser {
                email,
                password_hash,
                first_name,
                last_name,
                department: fields::normalize_org_field(&request.department),
                position: fields::normalize_org_field(&request.position),
                role: request.role,
                is_active: request.is_active,
                is_superuser: false,
                must_change_password: true,
            })
            .await?;

        audit::user_created(actor.user_id, user.id, &user.email, user.role.as_str());

        Ok(CreatedUser {
            user,
            temporary_password,
        })
    }

    async fn delete_user(&self, actor: Actor, user_id: i32) -> Result<User, UserError> {
        let user = self.require_user(user_id).await?;
        actor.check_user_deletion(user.id, user.is_superuser)?;

        let mut files = self.store.certificate_file_paths_for_user(user_id).await?;
        files.extend(user.profile_image.clone());

        if !self.store.delete_user(user_id).await? {
            return Err(UserError::NotFound);
        }

        for path in &files {
            self.files.remove(path).await;
        }

        info!(user_id, files = files.len(), "Removed user and stored files");
        audit::user_deleted(actor.user_id, user.id, &user.email);

        Ok(user)
    }
}
