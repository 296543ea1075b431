//! Tenants partition every other record in the system.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").expect("valid slug regex"));

/// Tenant (organisation) entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// URL-safe unique identifier used at registration
    #[schema(example = "acme")]
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// Normalize and validate a tenant slug (lowercase letters, digits, dashes).
pub fn normalize_slug(raw: &str) -> AppResult<String> {
    let slug = raw.trim().to_lowercase();
    if SLUG_PATTERN.is_match(&slug) {
        Ok(slug)
    } else {
        Err(AppError::validation(
            "Tenant slug must be 1-63 lowercase letters, digits or dashes",
        ))
    }
}
