//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.
//! Relations are left empty; joins are written explicitly in the stores.

pub mod calendar_event;
pub mod chat_message;
pub mod code_document;
pub mod communication_link;
pub mod conversation;
pub mod conversation_participant;
pub mod notification;
pub mod phone_call;
pub mod remote_session;
pub mod spreadsheet;
pub mod tenant;
pub mod unit;
pub mod unit_member;
pub mod unit_permission;
pub mod user;
