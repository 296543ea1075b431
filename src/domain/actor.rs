//! The authenticated caller as seen by the service layer.

use uuid::Uuid;

use super::UserRole;
use crate::errors::{AppError, AppResult};

/// Who is performing an operation. Every service call is scoped to
/// `tenant_id`; nothing crosses tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Uuid, tenant_id: Uuid, role: UserRole) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fail with `Forbidden` unless the actor is a tenant admin.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Fail with `Forbidden` unless the actor is `user_id` or an admin.
    pub fn require_self_or_admin(&self, user_id: Uuid) -> AppResult<()> {
        if self.user_id == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_self_or_admin() {
        let me = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        let user = Actor::new(me, tenant, UserRole::User);
        assert!(user.require_self_or_admin(me).is_ok());
        assert!(matches!(
            user.require_self_or_admin(Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));

        let admin = Actor::new(Uuid::new_v4(), tenant, UserRole::Admin);
        assert!(admin.require_self_or_admin(me).is_ok());
        assert!(admin.require_admin().is_ok());
        assert!(user.require_admin().is_err());
    }
}
