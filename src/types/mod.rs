//! Shared request/response types used across handlers.

mod pagination;
mod response;

pub use pagination::{Paginated, PaginationMeta, PaginationParams};
pub use response::{Created, MessageResponse, NoContent};
