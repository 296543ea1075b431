//! Unit of Work pattern implementation.
//!
//! Centralizes access to every repository and runs multi-step writes in a
//! single database transaction.

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IsolationLevel, QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use super::repositories::entities::{tenant, user};
use super::repositories::{
    conflict_on_unique, new_user_model, CalendarRepository, CalendarStore, ChatRepository,
    ChatStore, CodeRepository, CodeStore, NotificationRepository, NotificationStore,
    PhoneRepository, PhoneStore, RemoteSessionRepository, RemoteSessionStore,
    SpreadsheetRepository, SpreadsheetStore, TenantRepository, TenantStore, UnitRepository,
    UnitStore, UserRepository, UserStore,
};
use crate::domain::{NewUser, Tenant, User};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Unit of Work trait for dependency injection.
///
/// Not mockable directly because of the generic transaction methods; tests
/// provide their own implementation wrapping mock repositories.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn tenants(&self) -> Arc<dyn TenantRepository>;
    fn users(&self) -> Arc<dyn UserRepository>;
    fn units(&self) -> Arc<dyn UnitRepository>;
    fn calendar(&self) -> Arc<dyn CalendarRepository>;
    fn chat(&self) -> Arc<dyn ChatRepository>;
    fn spreadsheets(&self) -> Arc<dyn SpreadsheetRepository>;
    fn phone(&self) -> Arc<dyn PhoneRepository>;
    fn code(&self) -> Arc<dyn CodeRepository>;
    fn remote_sessions(&self) -> Arc<dyn RemoteSessionRepository>;
    fn notifications(&self) -> Arc<dyn NotificationRepository>;

    /// Execute a closure within a transaction.
    ///
    /// Committed on success, rolled back on error. ReadCommitted isolation.
    async fn transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> std::pin::Pin<
                Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'a>,
            > + Send,
        T: Send;
}

/// Tenant operations available inside a transaction
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TxTenants: Send + Sync {
    /// Find a tenant by slug, locking the row for the rest of the transaction
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Tenant>>;
    async fn create(&self, name: String, slug: String) -> AppResult<Tenant>;
}

/// User operations available inside a transaction
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TxUsers: Send + Sync {
    /// Find user by email including soft-deleted
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>>;
    async fn create(&self, new_user: NewUser) -> AppResult<User>;
}

/// Repository access bound to one open transaction.
pub struct TransactionContext<'a> {
    tenants: &'a dyn TxTenants,
    users: &'a dyn TxUsers,
}

impl<'a> TransactionContext<'a> {
    pub fn new(tenants: &'a dyn TxTenants, users: &'a dyn TxUsers) -> Self {
        Self { tenants, users }
    }

    pub fn tenants(&self) -> &'a dyn TxTenants {
        self.tenants
    }

    pub fn users(&self) -> &'a dyn TxUsers {
        self.users
    }
}

/// Concrete implementation of UnitOfWork
pub struct Persistence {
    db: DatabaseConnection,
    tenants: Arc<TenantStore>,
    users: Arc<UserStore>,
    units: Arc<UnitStore>,
    calendar: Arc<CalendarStore>,
    chat: Arc<ChatStore>,
    spreadsheets: Arc<SpreadsheetStore>,
    phone: Arc<PhoneStore>,
    code: Arc<CodeStore>,
    remote_sessions: Arc<RemoteSessionStore>,
    notifications: Arc<NotificationStore>,
}

impl Persistence {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            tenants: Arc::new(TenantStore::new(db.clone())),
            users: Arc::new(UserStore::new(db.clone())),
            units: Arc::new(UnitStore::new(db.clone())),
            calendar: Arc::new(CalendarStore::new(db.clone())),
            chat: Arc::new(ChatStore::new(db.clone())),
            spreadsheets: Arc::new(SpreadsheetStore::new(db.clone())),
            phone: Arc::new(PhoneStore::new(db.clone())),
            code: Arc::new(CodeStore::new(db.clone())),
            remote_sessions: Arc::new(RemoteSessionStore::new(db.clone())),
            notifications: Arc::new(NotificationStore::new(db.clone())),
            db,
        }
    }
}

#[async_trait]
impl UnitOfWork for Persistence {
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
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let tenants = TxTenantRepository { txn: &txn };
        let users = TxUserRepository { txn: &txn };

        match f(TransactionContext::new(&tenants, &users)).await {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!("Transaction rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Transaction-aware tenant repository.
pub struct TxTenantRepository<'a> {
    txn: &'a DatabaseTransaction,
}

#[async_trait]
impl TxTenants for TxTenantRepository<'_> {
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Tenant>> {
        use sea_orm::QuerySelect;

        let result = tenant::Entity::find()
            .filter(tenant::Column::Slug.eq(slug))
            .lock_shared()
            .one(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(Tenant::from))
    }

    async fn create(&self, name: String, slug: String) -> AppResult<Tenant> {
        let model = tenant::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(self.txn)
        .await
        .map_err(|e| conflict_on_unique(e, "Tenant"))?;

        Ok(Tenant::from(model))
    }
}

/// Transaction-aware user repository.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

#[async_trait]
impl TxUsers for TxUserRepository<'_> {
    async fn find_by_email_with_deleted(&self, email: &str) -> AppResult<Option<User>> {
        let result = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(self.txn)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let model = new_user_model(new_user)
            .insert(self.txn)
            .await
            .map_err(|e| conflict_on_unique(e, "Email"))?;

        Ok(User::from(model))
    }
}

/// Simpler API for executing transactional operations.
#[macro_export]
macro_rules! with_transaction {
    ($uow:expr, |$ctx:ident| $body:expr) => {
        $uow.transaction(|$ctx| Box::pin(async move { $body })).await
    };
}
