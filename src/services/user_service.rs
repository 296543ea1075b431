//! User service - Handles user-related business logic.
//!
//! Every operation is scoped to the caller's tenant. Soft-deleted users are
//! invisible except through the admin-only deleted listing and restore.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::is_valid_role;
use crate::domain::{Actor, UpdateUser, User};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::UnitOfWork;
use crate::types::{Paginated, PaginationParams};

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get active user by ID (self or admin)
    async fn get_user(&self, actor: &Actor, id: Uuid) -> AppResult<User>;

    /// Page through active users (admin)
    async fn list_users(&self, actor: &Actor, params: &PaginationParams)
        -> AppResult<Paginated<User>>;

    /// List only soft-deleted users (admin)
    async fn list_deleted_users(&self, actor: &Actor) -> AppResult<Vec<User>>;

    /// Update name (self or admin) and role (admin only)
    async fn update_user(&self, actor: &Actor, id: Uuid, changes: UpdateUser) -> AppResult<User>;

    /// Soft delete user (admin, never self)
    async fn delete_user(&self, actor: &Actor, id: Uuid) -> AppResult<()>;

    /// Restore a soft-deleted user (admin)
    async fn restore_user(&self, actor: &Actor, id: Uuid) -> AppResult<User>;
}

/// Concrete implementation of UserService using Unit of Work.
pub struct UserManager<U: UnitOfWork> {
    uow: Arc<U>,
}

impl<U: UnitOfWork> UserManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }
}

#[async_trait]
impl<U: UnitOfWork> UserService for UserManager<U> {
    async fn get_user(&self, actor: &Actor, id: Uuid) -> AppResult<User> {
        actor.require_self_or_admin(id)?;
        self.uow
            .users()
            .find_by_id(actor.tenant_id, id)
            .await?
            .ok_or_not_found()
    }

    async fn list_users(
        &self,
        actor: &Actor,
        params: &PaginationParams,
    ) -> AppResult<Paginated<User>> {
        actor.require_admin()?;
        let (users, total) = self.uow.users().list(actor.tenant_id, params).await?;
        Ok(Paginated::from_params(users, params, total))
    }

    async fn list_deleted_users(&self, actor: &Actor) -> AppResult<Vec<User>> {
        actor.require_admin()?;
        self.uow.users().list_deleted(actor.tenant_id).await
    }

    async fn update_user(&self, actor: &Actor, id: Uuid, changes: UpdateUser) -> AppResult<User> {
        actor.require_self_or_admin(id)?;

        if let Some(role) = &changes.role {
            actor.require_admin()?;
            if !is_valid_role(role) {
                return Err(AppError::validation(format!("Unknown role '{}'", role)));
            }
            // the last word on admin rights stays with another admin
            if id == actor.user_id && role != &actor.role.to_string() {
                return Err(AppError::validation("Admins cannot change their own role"));
            }
        }

        let name = match changes.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::validation("Name cannot be empty"))
            }
            other => other.map(|n| n.trim().to_string()),
        };

        self.uow
            .users()
            .update(actor.tenant_id, id, name, changes.role)
            .await
    }

    async fn delete_user(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        if id == actor.user_id {
            return Err(AppError::validation("You cannot delete your own account"));
        }
        self.uow.users().delete(actor.tenant_id, id).await?;
        tracing::info!(user_id = %id, by = %actor.user_id, "User soft-deleted");
        Ok(())
    }

    async fn restore_user(&self, actor: &Actor, id: Uuid) -> AppResult<User> {
        actor.require_admin()?;
        let user = self.uow.users().restore(actor.tenant_id, id).await?;
        tracing::info!(user_id = %id, by = %actor.user_id, "User restored");
        Ok(user)
    }
}
