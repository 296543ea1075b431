//! Org unit service - hierarchy, memberships, permission grants and
//! communication links.
//!
//! Reads are open to every tenant member. Mutations need an admin or a
//! holder of `units.manage`. Moves within a tenant are serialized by a
//! lock on its tree, so concurrent moves cannot close a cycle.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::access;
use crate::domain::{Actor, CommunicationLink, Permission, Unit, UnitGrant, UnitTree, User};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{LockManager, UnitOfWork};

/// Unit changes; `parent_id: Some(None)` moves the unit to the top level.
#[derive(Debug, Clone, Default)]
pub struct UnitChanges {
    pub name: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
}

#[async_trait]
pub trait UnitService: Send + Sync {
    async fn create_unit(&self, actor: &Actor, name: String, parent_id: Option<Uuid>)
        -> AppResult<Unit>;
    async fn get_unit(&self, actor: &Actor, id: Uuid) -> AppResult<Unit>;
    async fn list_units(&self, actor: &Actor) -> AppResult<Vec<Unit>>;
    async fn update_unit(&self, actor: &Actor, id: Uuid, changes: UnitChanges) -> AppResult<Unit>;
    /// Fails with a conflict while child units exist
    async fn delete_unit(&self, actor: &Actor, id: Uuid) -> AppResult<()>;

    /// Ancestors of a unit, nearest first
    async fn ancestors(&self, actor: &Actor, id: Uuid) -> AppResult<Vec<Unit>>;
    /// Every unit below `id`, breadth first
    async fn subtree(&self, actor: &Actor, id: Uuid) -> AppResult<Vec<Unit>>;

    async fn add_member(&self, actor: &Actor, unit_id: Uuid, user_id: Uuid) -> AppResult<()>;
    async fn remove_member(&self, actor: &Actor, unit_id: Uuid, user_id: Uuid) -> AppResult<()>;
    async fn members(&self, actor: &Actor, unit_id: Uuid) -> AppResult<Vec<User>>;
    async fn units_of(&self, actor: &Actor, user_id: Uuid) -> AppResult<Vec<Unit>>;

    async fn grant(&self, actor: &Actor, unit_id: Uuid, permission: Permission)
        -> AppResult<UnitGrant>;
    async fn revoke(&self, actor: &Actor, unit_id: Uuid, permission: Permission) -> AppResult<()>;
    async fn permissions(&self, actor: &Actor, unit_id: Uuid) -> AppResult<Vec<UnitGrant>>;
    /// Permissions `user_id` holds through its units (self or admin)
    async fn effective_permissions(&self, actor: &Actor, user_id: Uuid)
        -> AppResult<Vec<Permission>>;
    async fn has_permission(&self, actor: &Actor, permission: Permission) -> AppResult<bool>;

    async fn link(
        &self,
        actor: &Actor,
        source_unit_id: Uuid,
        target_unit_id: Uuid,
        bidirectional: bool,
    ) -> AppResult<CommunicationLink>;
    async fn unlink(&self, actor: &Actor, link_id: Uuid) -> AppResult<()>;
    async fn links(&self, actor: &Actor) -> AppResult<Vec<CommunicationLink>>;
    /// Whether the actor may contact `user_id`
    async fn can_communicate(&self, actor: &Actor, user_id: Uuid) -> AppResult<bool>;
}

pub struct UnitManager<U: UnitOfWork> {
    uow: Arc<U>,
    locks: Arc<dyn LockManager>,
}

fn tree_resource(tenant_id: Uuid) -> String {
    format!("units:{}", tenant_id)
}

impl<U: UnitOfWork> UnitManager<U> {
    pub fn new(uow: Arc<U>, locks: Arc<dyn LockManager>) -> Self {
        Self { uow, locks }
    }

    async fn require_manage(&self, actor: &Actor) -> AppResult<()> {
        access::require_permission(self.uow.as_ref(), actor, Permission::UnitsManage).await
    }

    async fn find_unit(&self, actor: &Actor, id: Uuid) -> AppResult<Unit> {
        self.uow
            .units()
            .find(actor.tenant_id, id)
            .await?
            .ok_or_not_found()
    }

    /// All tenant units keyed by id, plus the tree over them.
    async fn load_tree(&self, actor: &Actor) -> AppResult<(HashMap<Uuid, Unit>, UnitTree)> {
        let units = self.uow.units().list(actor.tenant_id).await?;
        let tree = UnitTree::new(&units);
        let by_id = units.into_iter().map(|u| (u.id, u)).collect();
        Ok((by_id, tree))
    }

    async fn apply_changes(&self, actor: &Actor, id: Uuid, changes: UnitChanges) -> AppResult<Unit> {
        let (by_id, tree) = self.load_tree(actor).await?;
        let mut unit = by_id.get(&id).cloned().ok_or(AppError::NotFound)?;

        if let Some(name) = changes.name {
            unit.name = clean_name(&name)?;
        }
        if let Some(parent_id) = changes.parent_id {
            tree.validate_parent(id, parent_id)?;
            unit.parent_id = parent_id;
        }
        unit.updated_at = Utc::now();

        self.uow.units().update(unit).await
    }
}

fn clean_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Unit name cannot be empty"));
    }
    Ok(name.to_string())
}

fn resolve(by_id: &HashMap<Uuid, Unit>, ids: Vec<Uuid>) -> Vec<Unit> {
    ids.into_iter()
        .filter_map(|id| by_id.get(&id).cloned())
        .collect()
}

#[async_trait]
impl<U: UnitOfWork> UnitService for UnitManager<U> {
    async fn create_unit(
        &self,
        actor: &Actor,
        name: String,
        parent_id: Option<Uuid>,
    ) -> AppResult<Unit> {
        self.require_manage(actor).await?;
        let name = clean_name(&name)?;

        if let Some(parent_id) = parent_id {
            if self.uow.units().find(actor.tenant_id, parent_id).await?.is_none() {
                return Err(AppError::validation("Parent unit does not exist"));
            }
        }

        let now = Utc::now();
        let unit = self
            .uow
            .units()
            .create(Unit {
                id: Uuid::new_v4(),
                tenant_id: actor.tenant_id,
                name,
                parent_id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(unit_id = %unit.id, parent_id = ?unit.parent_id, "Unit created");
        Ok(unit)
    }

    async fn get_unit(&self, actor: &Actor, id: Uuid) -> AppResult<Unit> {
        self.find_unit(actor, id).await
    }

    async fn list_units(&self, actor: &Actor) -> AppResult<Vec<Unit>> {
        self.uow.units().list(actor.tenant_id).await
    }

    async fn update_unit(&self, actor: &Actor, id: Uuid, changes: UnitChanges) -> AppResult<Unit> {
        self.require_manage(actor).await?;
        if changes.parent_id.is_none() {
            return self.apply_changes(actor, id, changes).await;
        }

        let token = self.locks.acquire(&tree_resource(actor.tenant_id)).await?;
        let result = self.apply_changes(actor, id, changes).await;
        if let Err(e) = self.locks.release(token).await {
            tracing::warn!(tenant_id = %actor.tenant_id, error = %e, "Failed to release unit tree lock");
        }
        result
    }

    async fn delete_unit(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        self.require_manage(actor).await?;
        self.find_unit(actor, id).await?;

        if self.uow.units().count_children(actor.tenant_id, id).await? > 0 {
            return Err(AppError::state_conflict(
                "Unit has child units; move or delete them first",
            ));
        }

        self.uow.units().delete(actor.tenant_id, id).await?;
        tracing::info!(unit_id = %id, by = %actor.user_id, "Unit deleted");
        Ok(())
    }

    async fn ancestors(&self, actor: &Actor, id: Uuid) -> AppResult<Vec<Unit>> {
        let (by_id, tree) = self.load_tree(actor).await?;
        if !tree.contains(id) {
            return Err(AppError::NotFound);
        }
        Ok(resolve(&by_id, tree.ancestors(id)))
    }

    async fn subtree(&self, actor: &Actor, id: Uuid) -> AppResult<Vec<Unit>> {
        let (by_id, tree) = self.load_tree(actor).await?;
        if !tree.contains(id) {
            return Err(AppError::NotFound);
        }
        Ok(resolve(&by_id, tree.descendants(id)))
    }

    async fn add_member(&self, actor: &Actor, unit_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.require_manage(actor).await?;
        self.find_unit(actor, unit_id).await?;
        self.uow
            .users()
            .find_by_id(actor.tenant_id, user_id)
            .await?
            .ok_or_not_found()?;

        if !self.uow.units().add_member(unit_id, user_id).await? {
            return Err(AppError::conflict("Membership"));
        }
        tracing::info!(unit_id = %unit_id, user_id = %user_id, "Member added");
        Ok(())
    }

    async fn remove_member(&self, actor: &Actor, unit_id: Uuid, user_id: Uuid) -> AppResult<()> {
        self.require_manage(actor).await?;
        self.find_unit(actor, unit_id).await?;

        if !self.uow.units().remove_member(unit_id, user_id).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(unit_id = %unit_id, user_id = %user_id, "Member removed");
        Ok(())
    }

    async fn members(&self, actor: &Actor, unit_id: Uuid) -> AppResult<Vec<User>> {
        self.find_unit(actor, unit_id).await?;
        let ids = self.uow.units().members(unit_id).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.uow.users().find_many(actor.tenant_id, ids).await
    }

    async fn units_of(&self, actor: &Actor, user_id: Uuid) -> AppResult<Vec<Unit>> {
        let ids = self.uow.units().units_of(actor.tenant_id, user_id).await?;
        let (by_id, _) = self.load_tree(actor).await?;
        Ok(resolve(&by_id, ids))
    }

    async fn grant(
        &self,
        actor: &Actor,
        unit_id: Uuid,
        permission: Permission,
    ) -> AppResult<UnitGrant> {
        self.require_manage(actor).await?;
        self.find_unit(actor, unit_id).await?;

        let grant = self.uow.units().grant(unit_id, permission).await?;
        tracing::info!(unit_id = %unit_id, permission = %permission, "Permission granted");
        Ok(grant)
    }

    async fn revoke(&self, actor: &Actor, unit_id: Uuid, permission: Permission) -> AppResult<()> {
        self.require_manage(actor).await?;
        self.find_unit(actor, unit_id).await?;

        if !self.uow.units().revoke(unit_id, permission).await? {
            return Err(AppError::NotFound);
        }
        tracing::info!(unit_id = %unit_id, permission = %permission, "Permission revoked");
        Ok(())
    }

    async fn permissions(&self, actor: &Actor, unit_id: Uuid) -> AppResult<Vec<UnitGrant>> {
        self.find_unit(actor, unit_id).await?;
        self.uow.units().grants(unit_id).await
    }

    async fn effective_permissions(
        &self,
        actor: &Actor,
        user_id: Uuid,
    ) -> AppResult<Vec<Permission>> {
        actor.require_self_or_admin(user_id)?;
        let user = self
            .uow
            .users()
            .find_by_id(actor.tenant_id, user_id)
            .await?
            .ok_or_not_found()?;
        access::permissions_of(self.uow.as_ref(), &user).await
    }

    async fn has_permission(&self, actor: &Actor, permission: Permission) -> AppResult<bool> {
        access::has_permission(self.uow.as_ref(), actor, permission).await
    }

    async fn link(
        &self,
        actor: &Actor,
        source_unit_id: Uuid,
        target_unit_id: Uuid,
        bidirectional: bool,
    ) -> AppResult<CommunicationLink> {
        self.require_manage(actor).await?;
        if source_unit_id == target_unit_id {
            return Err(AppError::validation("A unit cannot be linked to itself"));
        }
        self.find_unit(actor, source_unit_id).await?;
        self.find_unit(actor, target_unit_id).await?;

        if self
            .uow
            .units()
            .find_link(actor.tenant_id, source_unit_id, target_unit_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Link"));
        }

        let link = self
            .uow
            .units()
            .create_link(CommunicationLink {
                id: Uuid::new_v4(),
                tenant_id: actor.tenant_id,
                source_unit_id,
                target_unit_id,
                bidirectional,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            link_id = %link.id,
            source = %source_unit_id,
            target = %target_unit_id,
            bidirectional,
            "Communication link created"
        );
        Ok(link)
    }

    async fn unlink(&self, actor: &Actor, link_id: Uuid) -> AppResult<()> {
        self.require_manage(actor).await?;
        if !self.uow.units().delete_link(actor.tenant_id, link_id).await? {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn links(&self, actor: &Actor) -> AppResult<Vec<CommunicationLink>> {
        self.uow.units().links(actor.tenant_id).await
    }

    async fn can_communicate(&self, actor: &Actor, user_id: Uuid) -> AppResult<bool> {
        match access::require_reachable(self.uow.as_ref(), actor, user_id).await {
            Ok(_) => Ok(true),
            Err(AppError::Forbidden) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
