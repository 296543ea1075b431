//! Domain layer - core business entities and logic
//!
//! Entities, value objects and the pure evaluators (org hierarchy,
//! permission inheritance, communication graph, state machines). Nothing
//! here talks to the database or the network.

pub mod actor;
pub mod calendar;
pub mod chat;
pub mod code;
pub mod notification;
pub mod password;
pub mod phone;
pub mod remote;
pub mod spreadsheet;
pub mod tenant;
pub mod unit;
pub mod user;

pub use actor::Actor;
pub use calendar::{CalendarEvent, EventChanges, NewEvent, TimeWindow};
pub use chat::{ChatMessage, Conversation, ConversationDetails, Participant};
pub use code::{CodeDocument, Language};
pub use notification::{kinds, Notification, PushEvent};
pub use password::Password;
pub use phone::{CallStatus, PhoneCall, PhoneCallResponse};
pub use remote::{Frame, FrameFormat, InputEvent, MouseButton, RemoteSession, SessionStatus};
pub use spreadsheet::{CellAddress, CellUpdate, Cells, Spreadsheet};
pub use tenant::Tenant;
pub use unit::{
    effective_permissions, CommunicationGraph, CommunicationLink, Permission, Unit, UnitGrant,
    UnitTree,
};
pub use user::{NewUser, UpdateUser, User, UserResponse, UserRole};
