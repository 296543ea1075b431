//! Org unit repository: units, memberships, permission grants and
//! communication links.

use async_trait::async_trait;
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::base::conflict_on_unique;
use super::entities::{communication_link, unit, unit_member, unit_permission};
use crate::domain::{CommunicationLink, Permission, Unit, UnitGrant};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UnitRepository: Send + Sync {
    // Units

    async fn create(&self, unit: Unit) -> AppResult<Unit>;

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Unit>>;

    /// Every unit of the tenant ordered by name
    async fn list(&self, tenant_id: Uuid) -> AppResult<Vec<Unit>>;

    async fn update(&self, unit: Unit) -> AppResult<Unit>;

    /// Delete a unit; memberships, grants and links go with it
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()>;

    async fn count_children(&self, tenant_id: Uuid, id: Uuid) -> AppResult<u64>;

    // Memberships

    /// Returns false if the user was already a member
    async fn add_member(&self, unit_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    /// Returns false if the user was not a member
    async fn remove_member(&self, unit_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    async fn members(&self, unit_id: Uuid) -> AppResult<Vec<Uuid>>;

    async fn units_of(&self, tenant_id: Uuid, user_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// All `(unit_id, user_id)` pairs of the tenant
    async fn memberships(&self, tenant_id: Uuid) -> AppResult<Vec<(Uuid, Uuid)>>;

    // Grants

    async fn grant(&self, unit_id: Uuid, permission: Permission) -> AppResult<UnitGrant>;

    /// Returns false if the grant did not exist
    async fn revoke(&self, unit_id: Uuid, permission: Permission) -> AppResult<bool>;

    async fn grants(&self, unit_id: Uuid) -> AppResult<Vec<UnitGrant>>;

    /// All `(unit_id, permission)` grants of the tenant
    async fn tenant_grants(&self, tenant_id: Uuid) -> AppResult<Vec<(Uuid, Permission)>>;

    // Links

    async fn create_link(&self, link: CommunicationLink) -> AppResult<CommunicationLink>;

    async fn find_link(
        &self,
        tenant_id: Uuid,
        source_unit_id: Uuid,
        target_unit_id: Uuid,
    ) -> AppResult<Option<CommunicationLink>>;

    /// Returns false if no such link existed
    async fn delete_link(&self, tenant_id: Uuid, id: Uuid) -> AppResult<bool>;

    async fn links(&self, tenant_id: Uuid) -> AppResult<Vec<CommunicationLink>>;
}

pub struct UnitStore {
    db: DatabaseConnection,
}

impl UnitStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn tenant_unit_ids(tenant_id: Uuid) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(unit::Column::Id)
        .from(unit::Entity)
        .and_where(unit::Column::TenantId.eq(tenant_id))
        .to_owned()
}

#[async_trait]
impl UnitRepository for UnitStore {
    async fn create(&self, unit: Unit) -> AppResult<Unit> {
        let active = unit::ActiveModel {
            id: Set(unit.id),
            tenant_id: Set(unit.tenant_id),
            name: Set(unit.name),
            parent_id: Set(unit.parent_id),
            created_at: Set(unit.created_at),
            updated_at: Set(unit.updated_at),
        };
        let model = active.insert(&self.db).await.map_err(AppError::from)?;
        Ok(Unit::from(model))
    }

    async fn find(&self, tenant_id: Uuid, id: Uuid) -> AppResult<Option<Unit>> {
        let result = unit::Entity::find_by_id(id)
            .filter(unit::Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Unit::from))
    }

    async fn list(&self, tenant_id: Uuid) -> AppResult<Vec<Unit>> {
        let models = unit::Entity::find()
            .filter(unit::Column::TenantId.eq(tenant_id))
            .order_by_asc(unit::Column::Name)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(Unit::from).collect())
    }

    async fn update(&self, unit: Unit) -> AppResult<Unit> {
        let existing = unit::Entity::find_by_id(unit.id)
            .filter(unit::Column::TenantId.eq(unit.tenant_id))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: unit::ActiveModel = existing.into();
        active.name = Set(unit.name);
        active.parent_id = Set(unit.parent_id);
        active.updated_at = Set(chrono::Utc::now());

        let model = active.update(&self.db).await.map_err(AppError::from)?;
        Ok(Unit::from(model))
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> AppResult<()> {
        let result = unit::Entity::delete_many()
            .filter(unit::Column::Id.eq(id))
            .filter(unit::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn count_children(&self, tenant_id: Uuid, id: Uuid) -> AppResult<u64> {
        unit::Entity::find()
            .filter(unit::Column::TenantId.eq(tenant_id))
            .filter(unit::Column::ParentId.eq(id))
            .count(&self.db)
            .await
            .map_err(Into::into)
    }

    async fn add_member(&self, unit_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let existing = unit_member::Entity::find_by_id((unit_id, user_id))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        unit_member::ActiveModel {
            unit_id: Set(unit_id),
            user_id: Set(user_id),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Membership"))?;
        Ok(true)
    }

    async fn remove_member(&self, unit_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = unit_member::Entity::delete_by_id((unit_id, user_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected > 0)
    }

    async fn members(&self, unit_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = unit_member::Entity::find()
            .select_only()
            .column(unit_member::Column::UserId)
            .filter(unit_member::Column::UnitId.eq(unit_id))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(ids)
    }

    async fn units_of(&self, tenant_id: Uuid, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = unit_member::Entity::find()
            .select_only()
            .column(unit_member::Column::UnitId)
            .filter(unit_member::Column::UserId.eq(user_id))
            .filter(unit_member::Column::UnitId.in_subquery(tenant_unit_ids(tenant_id)))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(ids)
    }

    async fn memberships(&self, tenant_id: Uuid) -> AppResult<Vec<(Uuid, Uuid)>> {
        let pairs = unit_member::Entity::find()
            .select_only()
            .column(unit_member::Column::UnitId)
            .column(unit_member::Column::UserId)
            .filter(unit_member::Column::UnitId.in_subquery(tenant_unit_ids(tenant_id)))
            .into_tuple::<(Uuid, Uuid)>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(pairs)
    }

    async fn grant(&self, unit_id: Uuid, permission: Permission) -> AppResult<UnitGrant> {
        let model = unit_permission::ActiveModel {
            id: Set(Uuid::new_v4()),
            unit_id: Set(unit_id),
            permission: Set(permission.as_str().to_string()),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Grant"))?;

        UnitGrant::try_from(model)
    }

    async fn revoke(&self, unit_id: Uuid, permission: Permission) -> AppResult<bool> {
        let result = unit_permission::Entity::delete_many()
            .filter(unit_permission::Column::UnitId.eq(unit_id))
            .filter(unit_permission::Column::Permission.eq(permission.as_str()))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected > 0)
    }

    async fn grants(&self, unit_id: Uuid) -> AppResult<Vec<UnitGrant>> {
        unit_permission::Entity::find()
            .filter(unit_permission::Column::UnitId.eq(unit_id))
            .order_by_asc(unit_permission::Column::Permission)
            .all(&self.db)
            .await
            .map_err(AppError::from)?
            .into_iter()
            .map(UnitGrant::try_from)
            .collect()
    }

    async fn tenant_grants(&self, tenant_id: Uuid) -> AppResult<Vec<(Uuid, Permission)>> {
        let rows = unit_permission::Entity::find()
            .select_only()
            .column(unit_permission::Column::UnitId)
            .column(unit_permission::Column::Permission)
            .filter(unit_permission::Column::UnitId.in_subquery(tenant_unit_ids(tenant_id)))
            .into_tuple::<(Uuid, String)>()
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let mut grants = Vec::with_capacity(rows.len());
        for (unit_id, name) in rows {
            match name.parse::<Permission>() {
                Ok(permission) => grants.push((unit_id, permission)),
                Err(_) => tracing::warn!(%unit_id, permission = %name, "Ignoring unknown permission grant"),
            }
        }
        Ok(grants)
    }

    async fn create_link(&self, link: CommunicationLink) -> AppResult<CommunicationLink> {
        let model = communication_link::ActiveModel {
            id: Set(link.id),
            tenant_id: Set(link.tenant_id),
            source_unit_id: Set(link.source_unit_id),
            target_unit_id: Set(link.target_unit_id),
            bidirectional: Set(link.bidirectional),
            created_at: Set(link.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(|e| conflict_on_unique(e, "Link"))?;

        Ok(CommunicationLink::from(model))
    }

    async fn find_link(
        &self,
        tenant_id: Uuid,
        source_unit_id: Uuid,
        target_unit_id: Uuid,
    ) -> AppResult<Option<CommunicationLink>> {
        let result = communication_link::Entity::find()
            .filter(communication_link::Column::TenantId.eq(tenant_id))
            .filter(communication_link::Column::SourceUnitId.eq(source_unit_id))
            .filter(communication_link::Column::TargetUnitId.eq(target_unit_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(CommunicationLink::from))
    }

    async fn delete_link(&self, tenant_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = communication_link::Entity::delete_many()
            .filter(communication_link::Column::Id.eq(id))
            .filter(communication_link::Column::TenantId.eq(tenant_id))
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected > 0)
    }

    async fn links(&self, tenant_id: Uuid) -> AppResult<Vec<CommunicationLink>> {
        let models = communication_link::Entity::find()
            .filter(communication_link::Column::TenantId.eq(tenant_id))
            .order_by_asc(communication_link::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(CommunicationLink::from).collect())
    }
}
