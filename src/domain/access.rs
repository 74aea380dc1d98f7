use super::Role;

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub role: Role,
    pub is_superuser: bool,
}

/// Reason a user deletion was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeletionDenied {
    #[error("You cannot delete your own account.")]
    OwnAccount,
    #[error("Superuser accounts cannot be deleted.")]
    Superuser,
}

impl Actor {
    #[must_use]
    pub const fn new(user_id: i32, role: Role, is_superuser: bool) -> Self {
        Self {
            user_id,
            role,
            is_superuser,
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin || self.is_superuser
    }

    /// Certificates may be changed by their owner or by an admin.
    #[must_use]
    pub fn can_modify(&self, owner_id: i32) -> bool {
        self.user_id == owner_id || self.is_admin()
    }

    #[must_use]
    pub fn can_edit_profile(&self, user_id: i32) -> bool {
        self.user_id == user_id || self.is_admin()
    }

    /// Checks whether `target_id` may be deleted by this actor. Admin
    /// membership is enforced by the route layer.
    pub const fn check_user_deletion(
        &self,
        target_id: i32,
        target_is_superuser: bool,
    ) -> Result<(), DeletionDenied> {
        if self.user_id == target_id {
            return Err(DeletionDenied::OwnAccount);
        }
        if target_is_superuser {
            return Err(DeletionDenied::Superuser);
        }
        Ok(())
    }
}
