use anyhow::Result;
use serde::Serialize;

use crate::domain::{Actor, Role};
use crate::entities::users;

/// User as exposed to the rest of the application (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub position: String,
    pub role: Role,
    pub is_active: bool,
    pub is_superuser: bool,
    pub must_change_password: bool,
    pub profile_image: Option<String>,
    pub date_joined: String,
    pub last_login: Option<String>,
    pub updated_at: String,
}

impl User {
    #[must_use]
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let trimmed = full.trim();
        if trimmed.is_empty() {
            self.email.clone()
        } else {
            trimmed.to_string()
        }
    }

    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor::new(self.id, self.role, self.is_superuser)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.actor().is_admin()
    }
}

impl TryFrom<users::Model> for User {
    type Error = anyhow::Error;

    fn try_from(model: users::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            role: model.role.parse()?,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            department: model.department,
            position: model.position,
            is_active: model.is_active,
            is_superuser: model.is_superuser,
            must_change_password: model.must_change_password,
            profile_image: model.profile_image,
            date_joined: model.date_joined,
            last_login: model.last_login,
            updated_at: model.updated_at,
        })
    }
}

/// Fields for inserting a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub department: String,
    pub position: String,
    pub role: Role,
    pub is_active: bool,
    pub is_superuser: bool,
    pub must_change_password: bool,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Minimal owner info embedded in certificate listings.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub department: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name(),
            department: user.department.clone(),
        }
    }
}

/// Per-user certificate tallies used by employee listings.
#[derive(Debug, Clone, Serialize)]
pub struct UserWithCounts {
    #[serde(flatten)]
    pub user: User,
    pub total_certificates: u64,
    pub active_certificates: u64,
    pub expired_certificates: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: 1,
            email: "jane@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            department: String::new(),
            position: String::new(),
            role: Role::Employee,
            is_active: true,
            is_superuser: false,
            must_change_password: false,
            profile_image: None,
            date_joined: String::new(),
            last_login: None,
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_full_name_falls_back_to_email() {
        assert_eq!(user("Jane", "Doe").full_name(), "Jane Doe");
        assert_eq!(user("", "").full_name(), "jane@example.com");
        assert_eq!(user("Jane", "").full_name(), "Jane");
    }
}
