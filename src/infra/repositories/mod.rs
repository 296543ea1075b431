//! Repository layer - Data access abstraction
//!
//! One trait per aggregate (mockable with the `test-utils` feature) and one
//! SeaORM-backed store implementing it.

mod base;
mod calendar_repository;
mod chat_repository;
mod code_repository;
pub(crate) mod entities;
mod notification_repository;
mod phone_repository;
mod remote_session_repository;
mod spreadsheet_repository;
mod tenant_repository;
mod unit_repository;
mod user_repository;

pub(crate) use base::conflict_on_unique;
pub(crate) use user_repository::new_user_model;

pub use calendar_repository::{CalendarRepository, CalendarStore};
pub use chat_repository::{ChatRepository, ChatStore};
pub use code_repository::{CodeRepository, CodeStore};
pub use notification_repository::{NotificationRepository, NotificationStore};
pub use phone_repository::{PhoneRepository, PhoneStore};
pub use remote_session_repository::{RemoteSessionRepository, RemoteSessionStore};
pub use spreadsheet_repository::{SpreadsheetRepository, SpreadsheetStore};
pub use tenant_repository::{TenantRepository, TenantStore};
pub use unit_repository::{UnitRepository, UnitStore};
pub use user_repository::{UserRepository, UserStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use calendar_repository::MockCalendarRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use chat_repository::MockChatRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use code_repository::MockCodeRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use notification_repository::MockNotificationRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use phone_repository::MockPhoneRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use remote_session_repository::MockRemoteSessionRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use spreadsheet_repository::MockSpreadsheetRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use tenant_repository::MockTenantRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use unit_repository::MockUnitRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
