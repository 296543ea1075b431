//! User and authentication service tests.

mod common;

use chrono::Utc;
use mockall::predicate::eq;
use uuid::Uuid;

use common::{actor, admin, user, Mocks};
use officehub::config::Config;
use officehub::domain::{NewUser, Password, Tenant, UpdateUser, User, UserRole};
use officehub::errors::AppError;
use officehub::services::{
    AuthService, Authenticator, Claims, Registration, UserManager, UserService,
};
use officehub::types::PaginationParams;

const SECRET: &str = "integration-test-secret-at-least-32-chars";

#[tokio::test]
async fn test_get_user_success() {
    let tenant = Uuid::new_v4();
    let me = actor(tenant);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .with(eq(tenant), eq(me.user_id))
        .returning(|tenant_id, id| Ok(Some(user(tenant_id, id))));

    let service = UserManager::new(mocks.into_uow());
    let found = service.get_user(&me, me.user_id).await.unwrap();

    assert_eq!(found.id, me.user_id);
    assert_eq!(found.tenant_id, tenant);
}

#[tokio::test]
async fn test_get_other_user_forbidden_for_members() {
    let me = actor(Uuid::new_v4());

    let service = UserManager::new(Mocks::default().into_uow());
    let result = service.get_user(&me, Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_get_user_not_found() {
    let boss = admin(Uuid::new_v4());

    let mut mocks = Mocks::default();
    mocks.users.expect_find_by_id().returning(|_, _| Ok(None));

    let service = UserManager::new(mocks.into_uow());
    let result = service.get_user(&boss, Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_list_users_paginated() {
    let tenant = Uuid::new_v4();
    let boss = admin(tenant);

    let mut mocks = Mocks::default();
    mocks.users.expect_list().returning(move |tenant_id, _| {
        Ok((
            vec![
                user(tenant_id, Uuid::new_v4()),
                user(tenant_id, Uuid::new_v4()),
            ],
            12,
        ))
    });

    let service = UserManager::new(mocks.into_uow());
    let params = PaginationParams {
        page: 2,
        per_page: 2,
    };
    let page = service.list_users(&boss, &params).await.unwrap();

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.meta.total, 12);
    assert_eq!(page.meta.total_pages, 6);
}

#[tokio::test]
async fn test_members_cannot_promote_themselves() {
    let me = actor(Uuid::new_v4());

    let mut mocks = Mocks::default();
    mocks.users.expect_update().never();

    let service = UserManager::new(mocks.into_uow());
    let changes = UpdateUser {
        name: None,
        role: Some("admin".into()),
    };
    let result = service.update_user(&me, me.user_id, changes).await;

    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let boss = admin(Uuid::new_v4());

    let mut mocks = Mocks::default();
    mocks.users.expect_delete().never();

    let service = UserManager::new(mocks.into_uow());
    let result = service.delete_user(&boss, boss.user_id).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_restore_user_success() {
    let tenant = Uuid::new_v4();
    let boss = admin(tenant);
    let target = Uuid::new_v4();

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_restore()
        .with(eq(tenant), eq(target))
        .returning(|tenant_id, id| Ok(user(tenant_id, id)));

    let service = UserManager::new(mocks.into_uow());
    let restored = service.restore_user(&boss, target).await.unwrap();

    assert_eq!(restored.id, target);
}

fn authenticator(mocks: Mocks) -> Authenticator<common::TestUnitOfWork> {
    Authenticator::new(mocks.into_uow(), Config::for_tests(SECRET))
}

fn registered(password: &str, role: UserRole) -> officehub::domain::User {
    let mut account = user(Uuid::new_v4(), Uuid::new_v4());
    account.email = "jane@example.com".into();
    account.password_hash = Password::new(password).unwrap().into_string();
    account.role = role;
    account
}

#[tokio::test]
async fn test_login_issues_verifiable_token() {
    let account = registered("correct-horse", UserRole::Admin);
    let (id, tenant_id) = (account.id, account.tenant_id);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_email()
        .withf(|email| email == "jane@example.com")
        .returning(move |_| Ok(Some(account.clone())));

    let auth = authenticator(mocks);
    let token = auth
        .login("  Jane@Example.com ".into(), "correct-horse".into())
        .await
        .unwrap();

    assert_eq!(token.token_type, "Bearer");
    let claims = auth.verify_token(&token.access_token).unwrap();
    assert_eq!(claims.sub, id);
    assert_eq!(claims.tenant_id, tenant_id);
    assert_eq!(claims.role, "admin");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let account = registered("correct-horse", UserRole::User);

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_email()
        .returning(move |email| {
            if email == "jane@example.com" {
                Ok(Some(account.clone()))
            } else {
                Ok(None)
            }
        });

    let auth = authenticator(mocks);

    assert!(matches!(
        auth.login("jane@example.com".into(), "wrong-horse".into())
            .await,
        Err(AppError::InvalidCredentials)
    ));
    assert!(matches!(
        auth.login("nobody@example.com".into(), "correct-horse".into())
            .await,
        Err(AppError::InvalidCredentials)
    ));
}

#[test]
fn test_verify_token_rejects_garbage() {
    let auth = authenticator(Mocks::default());
    assert!(auth.verify_token("not-a-token").is_err());
}

// Registration

fn registration(slug: &str) -> Registration {
    Registration {
        email: " Jane@Example.com ".into(),
        password: "correct-horse".into(),
        name: "Jane".into(),
        tenant_slug: slug.into(),
        tenant_name: None,
    }
}

fn tenant(slug: &str) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        name: slug.into(),
        slug: slug.into(),
        created_at: Utc::now(),
    }
}

fn created(new: NewUser) -> User {
    let mut account = user(new.tenant_id, Uuid::new_v4());
    account.email = new.email;
    account.password_hash = new.password_hash;
    account.name = new.name;
    account.role = new.role;
    account
}

#[tokio::test]
async fn test_register_new_slug_creates_tenant_with_admin() {
    let mut mocks = Mocks::default();
    mocks
        .tx_users
        .expect_find_by_email_with_deleted()
        .withf(|email| email == "jane@example.com")
        .returning(|_| Ok(None));
    mocks.tx_tenants.expect_find_by_slug().returning(|_| Ok(None));
    mocks
        .tx_tenants
        .expect_create()
        .withf(|name, slug| name == "acme" && slug == "acme")
        .times(1)
        .returning(|_, slug| Ok(tenant(&slug)));
    mocks
        .tx_users
        .expect_create()
        .times(1)
        .returning(|new| Ok(created(new)));

    let account = authenticator(mocks)
        .register(registration(" ACME "))
        .await
        .unwrap();

    assert_eq!(account.role, UserRole::Admin);
    assert_eq!(account.email, "jane@example.com");
    assert_ne!(account.password_hash, "correct-horse");
}

#[tokio::test]
async fn test_register_existing_slug_joins_as_user() {
    let acme = tenant("acme");
    let acme_id = acme.id;

    let mut mocks = Mocks::default();
    mocks
        .tx_users
        .expect_find_by_email_with_deleted()
        .returning(|_| Ok(None));
    mocks
        .tx_tenants
        .expect_find_by_slug()
        .withf(|slug| slug == "acme")
        .returning(move |_| Ok(Some(acme.clone())));
    mocks.tx_tenants.expect_create().never();
    mocks
        .tx_users
        .expect_create()
        .withf(move |new| new.tenant_id == acme_id && new.role == UserRole::User)
        .times(1)
        .returning(|new| Ok(created(new)));

    let account = authenticator(mocks)
        .register(registration("acme"))
        .await
        .unwrap();

    assert_eq!(account.tenant_id, acme_id);
    assert_eq!(account.role, UserRole::User);
}

#[tokio::test]
async fn test_register_reused_email_conflicts_even_when_deleted() {
    let mut removed = user(Uuid::new_v4(), Uuid::new_v4());
    removed.email = "jane@example.com".into();
    removed.deleted_at = Some(Utc::now());

    let mut mocks = Mocks::default();
    mocks
        .tx_users
        .expect_find_by_email_with_deleted()
        .returning(move |_| Ok(Some(removed.clone())));
    mocks.tx_tenants.expect_find_by_slug().never();
    mocks.tx_tenants.expect_create().never();
    mocks.tx_users.expect_create().never();

    let result = authenticator(mocks).register(registration("acme")).await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
}

// Sessions

fn claims_for(account: &User, role: &str) -> Claims {
    let now = Utc::now().timestamp();
    Claims {
        sub: account.id,
        tenant_id: account.tenant_id,
        email: account.email.clone(),
        role: role.into(),
        exp: now + 3600,
        iat: now,
    }
}

#[tokio::test]
async fn test_session_uses_stored_role_not_token_role() {
    let account = user(Uuid::new_v4(), Uuid::new_v4());
    let claims = claims_for(&account, "admin");

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .with(eq(account.tenant_id), eq(account.id))
        .returning(move |_, _| Ok(Some(account.clone())));

    let current = authenticator(mocks).session_user(&claims).await.unwrap();

    assert_eq!(current.role, UserRole::User);
}

#[tokio::test]
async fn test_session_rejects_removed_account() {
    let mut account = user(Uuid::new_v4(), Uuid::new_v4());
    account.deleted_at = Some(Utc::now());
    let claims = claims_for(&account, "user");
    let gone = claims_for(&user(Uuid::new_v4(), Uuid::new_v4()), "user");

    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .returning(move |_, id| {
            if id == account.id {
                Ok(Some(account.clone()))
            } else {
                Ok(None)
            }
        });

    let auth = authenticator(mocks);

    assert!(matches!(
        auth.session_user(&claims).await,
        Err(AppError::Unauthorized)
    ));
    assert!(matches!(
        auth.session_user(&gone).await,
        Err(AppError::Unauthorized)
    ));
}
