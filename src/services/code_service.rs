//! Code editor service - stored source documents.
//!
//! Owners manage their documents; holders of `code.edit` may read and edit
//! any document in the tenant.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::access;
use crate::domain::code::validate_content;
use crate::domain::{Actor, CodeDocument, Language, Permission};
use crate::errors::{AppError, AppResult};
use crate::infra::UnitOfWork;

/// Partial document update
#[derive(Debug, Clone, Default)]
pub struct DocumentChanges {
    pub name: Option<String>,
    pub language: Option<Language>,
    pub content: Option<String>,
}

#[async_trait]
pub trait CodeService: Send + Sync {
    async fn create_document(
        &self,
        actor: &Actor,
        name: String,
        language: Language,
        content: String,
    ) -> AppResult<CodeDocument>;
    async fn get_document(&self, actor: &Actor, id: Uuid) -> AppResult<CodeDocument>;
    async fn list_documents(&self, actor: &Actor) -> AppResult<Vec<CodeDocument>>;
    async fn update_document(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: DocumentChanges,
    ) -> AppResult<CodeDocument>;
    async fn delete_document(&self, actor: &Actor, id: Uuid) -> AppResult<()>;
}

pub struct CodeManager<U: UnitOfWork> {
    uow: Arc<U>,
}

fn clean_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Document name cannot be empty"));
    }
    Ok(name.to_string())
}

impl<U: UnitOfWork> CodeManager<U> {
    pub fn new(uow: Arc<U>) -> Self {
        Self { uow }
    }

    async fn is_editor(&self, actor: &Actor) -> AppResult<bool> {
        access::has_permission(self.uow.as_ref(), actor, Permission::CodeEdit).await
    }

    async fn accessible(&self, actor: &Actor, id: Uuid) -> AppResult<CodeDocument> {
        let document = self
            .uow
            .code()
            .find(actor.tenant_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if document.owner_id == actor.user_id || self.is_editor(actor).await? {
            Ok(document)
        } else {
            Err(AppError::NotFound)
        }
    }
}

#[async_trait]
impl<U: UnitOfWork> CodeService for CodeManager<U> {
    async fn create_document(
        &self,
        actor: &Actor,
        name: String,
        language: Language,
        content: String,
    ) -> AppResult<CodeDocument> {
        let name = clean_name(&name)?;
        validate_content(&content)?;

        let now = Utc::now();
        self.uow
            .code()
            .create(CodeDocument {
                id: Uuid::new_v4(),
                tenant_id: actor.tenant_id,
                owner_id: actor.user_id,
                name,
                language,
                content,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    async fn get_document(&self, actor: &Actor, id: Uuid) -> AppResult<CodeDocument> {
        self.accessible(actor, id).await
    }

    async fn list_documents(&self, actor: &Actor) -> AppResult<Vec<CodeDocument>> {
        let owner = if self.is_editor(actor).await? {
            None
        } else {
            Some(actor.user_id)
        };
        self.uow.code().list(actor.tenant_id, owner).await
    }

    async fn update_document(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: DocumentChanges,
    ) -> AppResult<CodeDocument> {
        let mut document = self.accessible(actor, id).await?;

        if let Some(name) = changes.name {
            document.name = clean_name(&name)?;
        }
        if let Some(language) = changes.language {
            document.language = language;
        }
        if let Some(content) = changes.content {
            validate_content(&content)?;
            document.content = content;
        }
        document.updated_at = Utc::now();

        self.uow.code().update(document).await
    }

    async fn delete_document(&self, actor: &Actor, id: Uuid) -> AppResult<()> {
        let document = self.accessible(actor, id).await?;
        if document.owner_id != actor.user_id && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        self.uow.code().delete(actor.tenant_id, id).await
    }
}
