use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::Role;
use crate::entities::users;
use crate::models::user::{NewUser, User, UserChanges};

/// Columns matched by a free-text user search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFields {
    /// First name, last name and email.
    NameAndEmail,
    /// Name and email plus department and position.
    Profile,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        user.map(User::try_from).transpose()
    }

    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        users::Entity::find()
            .filter(users::Column::Id.is_in(ids.iter().copied()))
            .all(&self.conn)
            .await
            .context("Failed to query users by ID")?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    /// Emails are stored lower-cased, so the lookup lower-cases its input.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        user.map(User::try_from).transpose()
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count = users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .count(&self.conn)
            .await
            .context("Failed to check email uniqueness")?;

        Ok(count > 0)
    }

    /// Verifies a password against the stored hash.
    /// Runs in `spawn_blocking` because Argon2 is CPU-intensive.
    pub async fn verify_password(&self, user_id: i32, password: &str) -> Result<bool> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(false);
        };

        let password_hash = user.password_hash;
        let password = password.to_string();

        task::spawn_blocking(move || verify_hash(&password_hash, &password))
            .await
            .context("Password verification task panicked")?
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = users::ActiveModel {
            email: Set(new_user.email.trim().to_lowercase()),
            password_hash: Set(new_user.password_hash),
            first_name: Set(new_user.first_name),
            last_name: Set(new_user.last_name),
            department: Set(new_user.department),
            position: Set(new_user.position),
            role: Set(new_user.role.as_str().to_string()),
            is_active: Set(new_user.is_active),
            is_superuser: Set(new_user.is_superuser),
            must_change_password: Set(new_user.must_change_password),
            profile_image: Set(None),
            date_joined: Set(now.clone()),
            last_login: Set(None),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert user")?;

        User::try_from(model)
    }

    pub async fn update(&self, id: i32, changes: UserChanges) -> Result<Option<User>> {
        let Some(model) = users::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = model.into();
        if let Some(first_name) = changes.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = changes.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(department) = changes.department {
            active.department = Set(department);
        }
        if let Some(position) = changes.position {
            active.position = Set(position);
        }
        if let Some(role) = changes.role {
            active.role = Set(role.as_str().to_string());
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update user")?;

        User::try_from(model).map(Some)
    }

    /// Stores a new password hash and clears the forced-change flag.
    pub async fn set_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user for password update")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(password_hash);
        active.must_change_password = Set(false);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn set_profile_image(&self, id: i32, path: Option<String>) -> Result<()> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))?;

        let mut active: users::ActiveModel = user.into();
        active.profile_image = Set(path);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        users::Entity::update_many()
            .col_expr(
                users::Column::LastLogin,
                sea_orm::sea_query::Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(users::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record last login")?;

        Ok(())
    }

    /// Deletes the user. Certificates go with it through the foreign key.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected > 0)
    }

    /// Lists users ordered by first then last name.
    pub async fn list(
        &self,
        active_only: bool,
        search: Option<&str>,
        fields: SearchFields,
    ) -> Result<Vec<User>> {
        let mut query = users::Entity::find();

        if active_only {
            query = query.filter(users::Column::IsActive.eq(true));
        }

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let mut condition = Condition::any()
                .add(users::Column::FirstName.contains(term))
                .add(users::Column::LastName.contains(term))
                .add(users::Column::Email.contains(term));
            if fields == SearchFields::Profile {
                condition = condition
                    .add(users::Column::Department.contains(term))
                    .add(users::Column::Position.contains(term));
            }
            query = query.filter(condition);
        }

        query
            .order_by_asc(users::Column::FirstName)
            .order_by_asc(users::Column::LastName)
            .all(&self.conn)
            .await
            .context("Failed to list users")?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    pub async fn count_active(&self) -> Result<u64> {
        users::Entity::find()
            .filter(users::Column::IsActive.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count active users")
    }

    pub async fn count_by_role(&self, role: Role) -> Result<u64> {
        users::Entity::find()
            .filter(users::Column::Role.eq(role.as_str()))
            .count(&self.conn)
            .await
            .context("Failed to count users by role")
    }
}

/// Checks `password` against an encoded Argon2 hash.
pub fn verify_hash(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2id with optional custom params.
/// If config is None, uses the argon2 crate defaults.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}
