//! Permission and reachability checks shared by the feature services.
//!
//! Loads one tenant's org data through the unit of work and hands it to the
//! pure evaluators in `domain::unit`. Admins short-circuit every check.

use uuid::Uuid;

use super::container::parallel;
use crate::domain::{
    effective_permissions, Actor, CommunicationGraph, Permission, User, UnitTree,
};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

/// Grants inherited by `user_id` from its units and their ancestors.
async fn granted<U: UnitOfWork + ?Sized>(
    uow: &U,
    tenant_id: Uuid,
    user_id: Uuid,
) -> AppResult<Vec<Permission>> {
    let units = uow.units();
    let (tenant_units, member_units, grants) = parallel::join3(
        units.list(tenant_id),
        units.units_of(tenant_id, user_id),
        units.tenant_grants(tenant_id),
    )
    .await?;

    let tree = UnitTree::new(&tenant_units);
    Ok(effective_permissions(&tree, &member_units, &grants))
}

/// Permissions held by `user`; admins hold every permission.
pub(crate) async fn permissions_of<U: UnitOfWork + ?Sized>(
    uow: &U,
    user: &User,
) -> AppResult<Vec<Permission>> {
    if user.is_admin() {
        return Ok(Permission::ALL.to_vec());
    }
    granted(uow, user.tenant_id, user.id).await
}

pub(crate) async fn has_permission<U: UnitOfWork + ?Sized>(
    uow: &U,
    actor: &Actor,
    permission: Permission,
) -> AppResult<bool> {
    if actor.is_admin() {
        return Ok(true);
    }
    let permissions = granted(uow, actor.tenant_id, actor.user_id).await?;
    Ok(permissions.contains(&permission))
}

/// `Forbidden` unless the actor holds `permission`.
pub(crate) async fn require_permission<U: UnitOfWork + ?Sized>(
    uow: &U,
    actor: &Actor,
    permission: Permission,
) -> AppResult<()> {
    if has_permission(uow, actor, permission).await? {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %actor.user_id,
            permission = %permission,
            "Permission denied"
        );
        Err(AppError::Forbidden)
    }
}

/// Build the communication graph of one tenant.
pub(crate) async fn load_graph<U: UnitOfWork + ?Sized>(
    uow: &U,
    tenant_id: Uuid,
) -> AppResult<CommunicationGraph> {
    let units = uow.units();
    let (tenant_units, memberships, links) = parallel::join3(
        units.list(tenant_id),
        units.memberships(tenant_id),
        units.links(tenant_id),
    )
    .await?;

    Ok(CommunicationGraph::new(
        UnitTree::new(&tenant_units),
        memberships,
        &links,
    ))
}

/// Whether the actor may contact `other`, an active user of the same
/// tenant. Admins on either side are always reachable.
pub(crate) fn reachable(graph: &CommunicationGraph, actor: &Actor, other: &User) -> bool {
    actor.is_admin() || other.is_admin() || graph.can_communicate(actor.user_id, other.id)
}

/// Resolve `user_id` inside the actor's tenant and fail with `Forbidden`
/// when the org rules keep the two apart.
pub(crate) async fn require_reachable<U: UnitOfWork + ?Sized>(
    uow: &U,
    actor: &Actor,
    user_id: Uuid,
) -> AppResult<User> {
    let other = uow
        .users()
        .find_by_id(actor.tenant_id, user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if actor.is_admin() || other.is_admin() || actor.user_id == other.id {
        return Ok(other);
    }

    let graph = load_graph(uow, actor.tenant_id).await?;
    if reachable(&graph, actor, &other) {
        Ok(other)
    } else {
        Err(AppError::Forbidden)
    }
}
