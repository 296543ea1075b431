//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain logic and infrastructure to fulfill
//! application use cases. They depend on abstractions (traits) for
//! dependency inversion.
//!
//! Every operation takes the calling [`Actor`](crate::domain::Actor) and is
//! scoped to its tenant. Repository access goes through the Unit of Work.

pub(crate) mod access;
mod auth_service;
mod calendar_service;
mod chat_service;
mod code_service;
pub mod container;
mod notification_service;
mod phone_service;
mod remote_service;
mod spreadsheet_service;
mod unit_service;
mod user_service;

// Service Container
pub use container::{Backends, ServiceContainer, Services};

// Service traits and implementations
pub use auth_service::{AuthService, Authenticator, Claims, Registration, TokenResponse};
pub use calendar_service::{CalendarManager, CalendarService};
pub use chat_service::{ChatManager, ChatService};
pub use code_service::{CodeManager, CodeService, DocumentChanges};
pub use notification_service::{NotificationManager, NotificationService};
pub use phone_service::{PhoneManager, PhoneService};
pub use remote_service::{RemoteManager, RemoteService};
pub use spreadsheet_service::{SpreadsheetManager, SpreadsheetService};
pub use unit_service::{UnitChanges, UnitManager, UnitService};
pub use user_service::{UserManager, UserService};

// Parallel execution utilities
pub use container::parallel;

#[cfg(any(test, feature = "test-utils"))]
pub use container::MockServiceContainer;
