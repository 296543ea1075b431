//! Shared fixtures for the service tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use officehub::domain::{Actor, CommunicationLink, Permission, Unit, User, UserRole};
use officehub::errors::AppResult;
use officehub::infra::{
    CalendarRepository, ChatRepository, CodeRepository, LockToken, MockCalendarRepository,
    MockChatRepository, MockCodeRepository, MockLockManager, MockNotificationRepository,
    MockPhoneRepository, MockRemoteSessionRepository, MockSpreadsheetRepository,
    MockTenantRepository, MockTxTenants, MockTxUsers, MockUnitRepository, MockUserRepository,
    NotificationRepository, PhoneRepository, RemoteSessionRepository, SpreadsheetRepository,
    TenantRepository, TransactionContext, UnitOfWork, UnitRepository, UserRepository,
};

/// Mock repositories handed to a `TestUnitOfWork`. Unset mocks panic on
/// any call, so each test only configures what it expects to be used.
#[derive(Default)]
pub struct Mocks {
    pub tenants: MockTenantRepository,
    pub users: MockUserRepository,
    pub units: MockUnitRepository,
    pub calendar: MockCalendarRepository,
    pub chat: MockChatRepository,
    pub spreadsheets: MockSpreadsheetRepository,
    pub phone: MockPhoneRepository,
    pub code: MockCodeRepository,
    pub remote_sessions: MockRemoteSessionRepository,
    pub notifications: MockNotificationRepository,
    /// Repositories seen inside `transaction`
    pub tx_tenants: MockTxTenants,
    pub tx_users: MockTxUsers,
}

impl Mocks {
    pub fn into_uow(self) -> Arc<TestUnitOfWork> {
        Arc::new(TestUnitOfWork {
            tenants: Arc::new(self.tenants),
            users: Arc::new(self.users),
            units: Arc::new(self.units),
            calendar: Arc::new(self.calendar),
            chat: Arc::new(self.chat),
            spreadsheets: Arc::new(self.spreadsheets),
            phone: Arc::new(self.phone),
            code: Arc::new(self.code),
            remote_sessions: Arc::new(self.remote_sessions),
            notifications: Arc::new(self.notifications),
            tx_tenants: self.tx_tenants,
            tx_users: self.tx_users,
        })
    }
}

/// Unit of work over mock repositories
pub struct TestUnitOfWork {
    tenants: Arc<MockTenantRepository>,
    users: Arc<MockUserRepository>,
    units: Arc<MockUnitRepository>,
    calendar: Arc<MockCalendarRepository>,
    chat: Arc<MockChatRepository>,
    spreadsheets: Arc<MockSpreadsheetRepository>,
    phone: Arc<MockPhoneRepository>,
    code: Arc<MockCodeRepository>,
    remote_sessions: Arc<MockRemoteSessionRepository>,
    notifications: Arc<MockNotificationRepository>,
    tx_tenants: MockTxTenants,
    tx_users: MockTxUsers,
}

#[async_trait]
impl UnitOfWork for TestUnitOfWork {
    fn tenants(&self) -> Arc<dyn TenantRepository> {
        self.tenants.clone()
    }

    fn users(&self) -> Arc<dyn UserRepository> {
        self.users.clone()
    }

    fn units(&self) -> Arc<dyn UnitRepository> {
        self.units.clone()
    }

    fn calendar(&self) -> Arc<dyn CalendarRepository> {
        self.calendar.clone()
    }

    fn chat(&self) -> Arc<dyn ChatRepository> {
        self.chat.clone()
    }

    fn spreadsheets(&self) -> Arc<dyn SpreadsheetRepository> {
        self.spreadsheets.clone()
    }

    fn phone(&self) -> Arc<dyn PhoneRepository> {
        self.phone.clone()
    }

    fn code(&self) -> Arc<dyn CodeRepository> {
        self.code.clone()
    }

    fn remote_sessions(&self) -> Arc<dyn RemoteSessionRepository> {
        self.remote_sessions.clone()
    }

    fn notifications(&self) -> Arc<dyn NotificationRepository> {
        self.notifications.clone()
    }

    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send,
    {
        // no rollback to simulate; the closure sees the transactional mocks
        f(TransactionContext::new(&self.tx_tenants, &self.tx_users)).await
    }
}

/// Lock manager that must be released exactly as often as acquired.
pub fn balanced_locks(times: usize) -> Arc<MockLockManager> {
    let mut locks = MockLockManager::new();
    locks.expect_acquire().times(times).returning(|resource| {
        Ok(LockToken {
            key: format!("lock:{}", resource),
            lock_id: Uuid::new_v4().to_string(),
        })
    });
    locks.expect_release().times(times).returning(|_| Ok(()));
    Arc::new(locks)
}

pub fn actor(tenant_id: Uuid) -> Actor {
    Actor::new(Uuid::new_v4(), tenant_id, UserRole::User)
}

pub fn admin(tenant_id: Uuid) -> Actor {
    Actor::new(Uuid::new_v4(), tenant_id, UserRole::Admin)
}

pub fn user(tenant_id: Uuid, id: Uuid) -> User {
    let now = Utc::now();
    User {
        id,
        tenant_id,
        email: format!("{}@example.com", id.simple()),
        password_hash: "hashed".to_string(),
        name: "Test User".to_string(),
        role: UserRole::User,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

pub fn unit(tenant_id: Uuid, name: &str, parent_id: Option<Uuid>) -> Unit {
    let now = Utc::now();
    Unit {
        id: Uuid::new_v4(),
        tenant_id,
        name: name.to_string(),
        parent_id,
        created_at: now,
        updated_at: now,
    }
}

pub fn link(tenant_id: Uuid, source: Uuid, target: Uuid, bidirectional: bool) -> CommunicationLink {
    CommunicationLink {
        id: Uuid::new_v4(),
        tenant_id,
        source_unit_id: source,
        target_unit_id: target,
        bidirectional,
        created_at: Utc::now(),
    }
}

/// Org layout behind permission and reachability checks.
#[derive(Default)]
pub struct Org {
    pub units: Vec<Unit>,
    /// `(unit_id, user_id)`
    pub memberships: Vec<(Uuid, Uuid)>,
    pub links: Vec<CommunicationLink>,
    pub grants: Vec<(Uuid, Permission)>,
}

impl Org {
    /// A single unit holding `actor` with `permissions` granted.
    pub fn team(actor: &Actor, permissions: &[Permission]) -> Self {
        let team = unit(actor.tenant_id, "Team", None);
        Self {
            memberships: vec![(team.id, actor.user_id)],
            grants: permissions.iter().map(|p| (team.id, *p)).collect(),
            units: vec![team],
            links: Vec::new(),
        }
    }

    /// Add `user_id` to the unit at `index`.
    pub fn join(mut self, index: usize, user_id: Uuid) -> Self {
        self.memberships.push((self.units[index].id, user_id));
        self
    }

    /// Answer every org query the services make from this layout.
    pub fn install(self, mock: &mut MockUnitRepository) {
        let Org {
            units,
            memberships,
            links,
            grants,
        } = self;

        let per_user = memberships.clone();
        mock.expect_list().returning(move |_| Ok(units.clone()));
        mock.expect_units_of().returning(move |_, user_id| {
            Ok(per_user
                .iter()
                .filter(|(_, member)| *member == user_id)
                .map(|(unit_id, _)| *unit_id)
                .collect())
        });
        mock.expect_memberships()
            .returning(move |_| Ok(memberships.clone()));
        mock.expect_links().returning(move |_| Ok(links.clone()));
        mock.expect_tenant_grants()
            .returning(move |_| Ok(grants.clone()));
    }
}
