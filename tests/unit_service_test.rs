//! Org hierarchy, permission and reachability tests.

mod common;

use std::sync::Arc;

use mockall::predicate::eq;
use uuid::Uuid;

use common::{actor, admin, balanced_locks, link, unit, user, Mocks, Org};
use officehub::domain::Permission;
use officehub::errors::AppError;
use officehub::infra::{LockToken, MockLockManager};
use officehub::services::{UnitChanges, UnitManager, UnitService};

#[tokio::test]
async fn test_create_unit_requires_manage_permission() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);

    let mut mocks = Mocks::default();
    Org::team(&me, &[Permission::PhoneCall]).install(&mut mocks.units);

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(0));
    let result = service.create_unit(&me, "Sales".into(), None).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_create_unit_with_granted_permission() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);

    let mut mocks = Mocks::default();
    Org::team(&me, &[Permission::UnitsManage]).install(&mut mocks.units);
    mocks.units.expect_create().returning(Ok);

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(0));
    let created = service
        .create_unit(&me, "  Sales  ".into(), None)
        .await
        .unwrap();

    assert_eq!(created.name, "Sales");
    assert_eq!(created.tenant_id, tenant);
    assert!(created.parent_id.is_none());
}

#[tokio::test]
async fn test_create_unit_with_unknown_parent() {
    let tenant = Uuid::new_v4();
    let parent = Uuid::new_v4();

    let mut mocks = Mocks::default();
    mocks
        .units
        .expect_find()
        .with(eq(tenant), eq(parent))
        .returning(|_, _| Ok(None));

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(0));
    let result = service
        .create_unit(&admin(tenant), "Sales".into(), Some(parent))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_delete_unit_with_children_conflicts() {
    let tenant = Uuid::new_v4();
    let root = unit(tenant, "Company", None);
    let root_id = root.id;

    let mut mocks = Mocks::default();
    mocks
        .units
        .expect_find()
        .returning(move |_, _| Ok(Some(root.clone())));
    mocks.units.expect_count_children().returning(|_, _| Ok(2));
    mocks.units.expect_delete().never();

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(0));
    let result = service.delete_unit(&admin(tenant), root_id).await;

    assert!(matches!(result, Err(AppError::StateConflict(_))));
}

#[tokio::test]
async fn test_update_unit_rejects_cycle() {
    let tenant = Uuid::new_v4();
    let root = unit(tenant, "Company", None);
    let child = unit(tenant, "Engineering", Some(root.id));
    let (root_id, child_id) = (root.id, child.id);

    let mut mocks = Mocks::default();
    mocks
        .units
        .expect_list()
        .returning(move |_| Ok(vec![root.clone(), child.clone()]));
    mocks.units.expect_update().never();

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(1));
    let changes = UnitChanges {
        name: None,
        parent_id: Some(Some(child_id)),
    };
    let result = service.update_unit(&admin(tenant), root_id, changes).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_reparent_holds_tenant_tree_lock() {
    let tenant = Uuid::new_v4();
    let root = unit(tenant, "Company", None);
    let sales = unit(tenant, "Sales", Some(root.id));
    let support = unit(tenant, "Support", Some(root.id));
    let (sales_id, support_id) = (sales.id, support.id);
    let resource = format!("units:{}", tenant);

    let mut mocks = Mocks::default();
    mocks
        .units
        .expect_list()
        .returning(move |_| Ok(vec![root.clone(), sales.clone(), support.clone()]));
    mocks
        .units
        .expect_update()
        .withf(move |u| u.parent_id == Some(sales_id))
        .times(1)
        .returning(Ok);

    let mut locks = MockLockManager::new();
    locks
        .expect_acquire()
        .withf(move |r| r == resource)
        .times(1)
        .returning(|r| {
            Ok(LockToken {
                key: format!("lock:{}", r),
                lock_id: "tree".into(),
            })
        });
    locks.expect_release().times(1).returning(|_| Ok(()));

    let service = UnitManager::new(mocks.into_uow(), Arc::new(locks));
    let changes = UnitChanges {
        name: None,
        parent_id: Some(Some(sales_id)),
    };
    let moved = service
        .update_unit(&admin(tenant), support_id, changes)
        .await
        .unwrap();

    assert_eq!(moved.parent_id, Some(sales_id));
}

#[tokio::test]
async fn test_rename_unit_skips_tree_lock() {
    let tenant = Uuid::new_v4();
    let root = unit(tenant, "Company", None);
    let root_id = root.id;

    let mut mocks = Mocks::default();
    mocks
        .units
        .expect_list()
        .returning(move |_| Ok(vec![root.clone()]));
    mocks.units.expect_update().times(1).returning(Ok);

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(0));
    let changes = UnitChanges {
        name: Some("Holding".into()),
        parent_id: None,
    };
    let renamed = service
        .update_unit(&admin(tenant), root_id, changes)
        .await
        .unwrap();

    assert_eq!(renamed.name, "Holding");
}

#[tokio::test]
async fn test_ancestors_nearest_first() {
    let tenant = Uuid::new_v4();
    let root = unit(tenant, "Company", None);
    let eng = unit(tenant, "Engineering", Some(root.id));
    let team = unit(tenant, "Platform", Some(eng.id));
    let (root_id, eng_id, team_id) = (root.id, eng.id, team.id);

    let mut mocks = Mocks::default();
    mocks
        .units
        .expect_list()
        .returning(move |_| Ok(vec![root.clone(), eng.clone(), team.clone()]));

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(0));
    let me = actor(tenant);

    let chain: Vec<Uuid> = service
        .ancestors(&me, team_id)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(chain, vec![eng_id, root_id]);

    let below: Vec<Uuid> = service
        .subtree(&me, root_id)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(below, vec![eng_id, team_id]);

    assert!(matches!(
        service.ancestors(&me, Uuid::new_v4()).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_effective_permissions_inherited_from_ancestors() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);
    let root = unit(tenant, "Company", None);
    let team = unit(tenant, "Platform", Some(root.id));

    let org = Org {
        memberships: vec![(team.id, me.user_id)],
        grants: vec![
            (root.id, Permission::PhoneCall),
            (team.id, Permission::CodeEdit),
        ],
        units: vec![root, team],
        links: Vec::new(),
    };

    let mut mocks = Mocks::default();
    org.install(&mut mocks.units);
    mocks
        .users
        .expect_find_by_id()
        .returning(|tenant_id, id| Ok(Some(user(tenant_id, id))));

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(0));
    let permissions = service.effective_permissions(&me, me.user_id).await.unwrap();

    assert_eq!(permissions, vec![Permission::PhoneCall, Permission::CodeEdit]);

    // other users' permissions are admin-only
    let other = service.effective_permissions(&me, Uuid::new_v4()).await;
    assert!(matches!(other, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_link_to_itself_rejected() {
    let tenant = Uuid::new_v4();
    let id = Uuid::new_v4();

    let service = UnitManager::new(Mocks::default().into_uow(), balanced_locks(0));
    let result = service.link(&admin(tenant), id, id, false).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_duplicate_link_conflicts() {
    let tenant = Uuid::new_v4();
    let sales = unit(tenant, "Sales", None);
    let support = unit(tenant, "Support", None);
    let existing = link(tenant, sales.id, support.id, false);
    let (sales_id, support_id) = (sales.id, support.id);

    let mut mocks = Mocks::default();
    mocks
        .units
        .expect_find()
        .returning(|tenant_id, id| {
            let mut found = unit(tenant_id, "Any", None);
            found.id = id;
            Ok(Some(found))
        });
    mocks
        .units
        .expect_find_link()
        .returning(move |_, _, _| Ok(Some(existing.clone())));
    mocks.units.expect_create_link().never();

    let service = UnitManager::new(mocks.into_uow(), balanced_locks(0));
    let result = service
        .link(&admin(tenant), sales_id, support_id, true)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

fn sibling_org(tenant: Uuid, alice: Uuid, bob: Uuid, linked: bool) -> Org {
    let root = unit(tenant, "Company", None);
    let sales = unit(tenant, "Sales", Some(root.id));
    let support = unit(tenant, "Support", Some(root.id));
    let links = if linked {
        vec![link(tenant, sales.id, support.id, false)]
    } else {
        Vec::new()
    };

    Org {
        memberships: vec![(sales.id, alice), (support.id, bob)],
        units: vec![root, sales, support],
        links,
        grants: Vec::new(),
    }
}

fn reachability_service(org: Org) -> UnitManager<common::TestUnitOfWork> {
    let mut mocks = Mocks::default();
    org.install(&mut mocks.units);
    mocks
        .users
        .expect_find_by_id()
        .returning(|tenant_id, id| Ok(Some(user(tenant_id, id))));

    UnitManager::new(mocks.into_uow(), balanced_locks(0))
}

#[tokio::test]
async fn test_siblings_without_link_cannot_communicate() {
    let tenant = Uuid::new_v4();
    let alice = actor(tenant);
    let bob = actor(tenant);

    let service = reachability_service(sibling_org(tenant, alice.user_id, bob.user_id, false));

    assert!(!service.can_communicate(&alice, bob.user_id).await.unwrap());
    assert!(!service.can_communicate(&bob, alice.user_id).await.unwrap());
}

#[tokio::test]
async fn test_directed_link_only_opens_one_way() {
    let tenant = Uuid::new_v4();
    let alice = actor(tenant);
    let bob = actor(tenant);

    let service = reachability_service(sibling_org(tenant, alice.user_id, bob.user_id, true));

    assert!(service.can_communicate(&alice, bob.user_id).await.unwrap());
    assert!(!service.can_communicate(&bob, alice.user_id).await.unwrap());
}
