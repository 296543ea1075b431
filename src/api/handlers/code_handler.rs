//! Code document handlers.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{CodeDocument, Language};
use crate::errors::AppResult;
use crate::services::DocumentChanges;
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    #[schema(example = "main.rs")]
    pub name: String,
    pub language: Language,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateDocumentRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub language: Option<Language>,
    pub content: Option<String>,
}

pub fn code_routes() -> Router<AppState> {
    Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/languages", get(languages))
}

/// Languages the editor supports
#[utoipa::path(
    get,
    path = "/api/code/languages",
    tag = "Code",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Supported languages", body = [Language]))
)]
pub async fn languages() -> Json<Vec<Language>> {
    Json(Language::ALL.to_vec())
}

#[utoipa::path(
    get,
    path = "/api/code/documents",
    tag = "Code",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Documents visible to the caller", body = [CodeDocument]))
)]
pub async fn list_documents(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CodeDocument>>> {
    Ok(Json(state.services.code().list_documents(&user.actor()).await?))
}

#[utoipa::path(
    post,
    path = "/api/code/documents",
    tag = "Code",
    security(("bearer_auth" = [])),
    request_body = CreateDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = CodeDocument),
        (status = 400, description = "Invalid name, language or oversized content")
    )
)]
pub async fn create_document(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateDocumentRequest>,
) -> AppResult<Created<CodeDocument>> {
    let document = state
        .services
        .code()
        .create_document(&user.actor(), payload.name, payload.language, payload.content)
        .await?;
    Ok(Created(document))
}

#[utoipa::path(
    get,
    path = "/api/code/documents/{id}",
    tag = "Code",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document", body = CodeDocument),
        (status = 404, description = "Document not found")
    )
)]
pub async fn get_document(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CodeDocument>> {
    Ok(Json(state.services.code().get_document(&user.actor(), id).await?))
}

#[utoipa::path(
    put,
    path = "/api/code/documents/{id}",
    tag = "Code",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = UpdateDocumentRequest,
    responses(
        (status = 200, description = "Document saved", body = CodeDocument),
        (status = 404, description = "Document not found")
    )
)]
pub async fn update_document(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateDocumentRequest>,
) -> AppResult<Json<CodeDocument>> {
    let changes = DocumentChanges {
        name: payload.name,
        language: payload.language,
        content: payload.content,
    };
    Ok(Json(
        state
            .services
            .code()
            .update_document(&user.actor(), id, changes)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/code/documents/{id}",
    tag = "Code",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 403, description = "Only the owner or an admin may delete")
    )
)]
pub async fn delete_document(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.code().delete_document(&user.actor(), id).await?;
    Ok(NoContent)
}
