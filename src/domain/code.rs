//! Code editor documents.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::MAX_CODE_DOCUMENT_BYTES;
use crate::errors::{AppError, AppResult};

/// Languages the editor can highlight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Plaintext,
    Rust,
    Python,
    Javascript,
    Typescript,
    Java,
    Go,
    Csharp,
    Cpp,
    Sql,
    Html,
    Css,
    Json,
    Yaml,
    Markdown,
    Shell,
}

impl Language {
    pub const ALL: [Language; 16] = [
        Language::Plaintext,
        Language::Rust,
        Language::Python,
        Language::Javascript,
        Language::Typescript,
        Language::Java,
        Language::Go,
        Language::Csharp,
        Language::Cpp,
        Language::Sql,
        Language::Html,
        Language::Css,
        Language::Json,
        Language::Yaml,
        Language::Markdown,
        Language::Shell,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Plaintext => "plaintext",
            Language::Rust => "rust",
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Typescript => "typescript",
            Language::Java => "java",
            Language::Go => "go",
            Language::Csharp => "csharp",
            Language::Cpp => "cpp",
            Language::Sql => "sql",
            Language::Html => "html",
            Language::Css => "css",
            Language::Json => "json",
            Language::Yaml => "yaml",
            Language::Markdown => "markdown",
            Language::Shell => "shell",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == lowered)
            .ok_or_else(|| AppError::validation(format!("Unsupported language '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CodeDocument {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub owner_id: Uuid,
    #[schema(example = "main.rs")]
    pub name: String,
    pub language: Language,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn validate_content(content: &str) -> AppResult<()> {
    if content.len() > MAX_CODE_DOCUMENT_BYTES {
        return Err(AppError::validation(format!(
            "Document content exceeds {} bytes",
            MAX_CODE_DOCUMENT_BYTES
        )));
    }
    Ok(())
}
