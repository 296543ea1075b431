//! OfficeHub - multi-tenant office suite backend
//!
//! One HTTP service hosting the collaboration tools of an organisation:
//! org units with permission grants and communication rules, calendars
//! with reminders, messaging, spreadsheets, simulated phone calls, code
//! documents and remote-desktop session brokerage. Every user event lands
//! in a notification inbox and is pushed live over a WebSocket.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **domain**: Core business entities and rules
//! - **services**: Use cases, tenant scoping and permission checks
//! - **infra**: Database, Redis, job queue and push hub
//! - **jobs**: Background job handlers
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (pagination, responses)
//! - **errors**: Centralized error handling
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! officehub serve
//!
//! # Run migrations
//! officehub migrate up
//!
//! # Start the reminder worker
//! officehub jobs work
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod jobs;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use domain::{Actor, Password, User, UserRole};
pub use errors::{AppError, AppResult};
pub use infra::Cache;
