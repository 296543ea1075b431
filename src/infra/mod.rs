//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Database connections, migrations and repositories
//! - Redis cache, rate limiting and distributed locks
//! - In-process push hub for WebSocket clients
//! - Background job queue
//! - Unit of Work for transaction management

pub mod cache;
pub mod db;
pub mod job_queue;
pub mod push;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{Cache, LockManager, LockToken};
pub use db::{Database, Migrator};
pub use job_queue::{reminder_storage, JobQueue, ReminderQueue};
pub use push::NotificationHub;
pub use repositories::{
    CalendarRepository, ChatRepository, CodeRepository, NotificationRepository, PhoneRepository,
    RemoteSessionRepository, SpreadsheetRepository, TenantRepository, UnitRepository,
    UserRepository,
};
pub use unit_of_work::{
    Persistence, TransactionContext, TxTenantRepository, TxTenants, TxUserRepository, TxUsers,
    UnitOfWork,
};

#[cfg(any(test, feature = "test-utils"))]
pub use cache::MockLockManager;
#[cfg(any(test, feature = "test-utils"))]
pub use job_queue::MockReminderQueue;
#[cfg(any(test, feature = "test-utils"))]
pub use unit_of_work::{MockTxTenants, MockTxUsers};
#[cfg(any(test, feature = "test-utils"))]
pub use repositories::{
    MockCalendarRepository, MockChatRepository, MockCodeRepository, MockNotificationRepository,
    MockPhoneRepository, MockRemoteSessionRepository, MockSpreadsheetRepository,
    MockTenantRepository, MockUnitRepository, MockUserRepository,
};
