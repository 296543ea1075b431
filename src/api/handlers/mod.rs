//! HTTP request handlers.

pub mod auth_handler;
pub mod calendar_handler;
pub mod chat_handler;
pub mod code_handler;
pub mod notification_handler;
pub mod phone_handler;
pub mod remote_handler;
pub mod spreadsheet_handler;
pub mod unit_handler;
pub mod user_handler;

pub use auth_handler::auth_routes;
pub use calendar_handler::calendar_routes;
pub use chat_handler::chat_routes;
pub use code_handler::code_routes;
pub use notification_handler::notification_routes;
pub use phone_handler::phone_routes;
pub use remote_handler::remote_routes;
pub use spreadsheet_handler::spreadsheet_routes;
pub use unit_handler::{permission_routes, unit_routes};
pub use user_handler::user_routes;

use serde::{Deserialize, Deserializer};

/// Deserialize a present field (even `null`) as `Some`, so that with
/// `#[serde(default)]` an omitted field stays `None`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
