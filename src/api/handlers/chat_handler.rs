//! Conversation and message handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{ChatMessage, Conversation, ConversationDetails};
use crate::errors::AppResult;
use crate::types::{Created, NoContent, Paginated, PaginationParams};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StartConversationRequest {
    /// Other participants; the caller is added automatically
    #[validate(length(min = 1, message = "At least one participant is required"))]
    pub participant_ids: Vec<Uuid>,
    /// Group title; a titled conversation is never reused
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    #[schema(example = "See you at ten")]
    pub body: String,
}

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_conversations).post(start_conversation))
        .route("/:id", get(get_conversation))
        .route("/:id/leave", post(leave_conversation))
        .route("/:id/read", post(mark_read))
        .route("/:id/messages", get(history).post(send_message))
        .route(
            "/:id/messages/:message_id",
            put(edit_message).delete(delete_message),
        )
}

/// Conversations the caller takes part in, most recent activity first
#[utoipa::path(
    get,
    path = "/api/conversations",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Conversations", body = [Conversation]))
)]
pub async fn list_conversations(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Conversation>>> {
    Ok(Json(
        state.services.chat().list_conversations(&user.actor()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/conversations",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    request_body = StartConversationRequest,
    responses(
        (status = 201, description = "Conversation started or reused", body = ConversationDetails),
        (status = 400, description = "Unknown participant"),
        (status = 403, description = "A participant is not reachable")
    )
)]
pub async fn start_conversation(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<StartConversationRequest>,
) -> AppResult<Created<ConversationDetails>> {
    let details = state
        .services
        .chat()
        .start_conversation(&user.actor(), payload.participant_ids, payload.title)
        .await?;
    Ok(Created(details))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation with participants", body = ConversationDetails),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn get_conversation(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ConversationDetails>> {
    Ok(Json(
        state.services.chat().get_conversation(&user.actor(), id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/leave",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 204, description = "Left the conversation"),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn leave_conversation(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .services
        .chat()
        .leave_conversation(&user.actor(), id)
        .await?;
    Ok(NoContent)
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/read",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses((status = 204, description = "Read marker moved"))
)]
pub async fn mark_read(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.chat().mark_read(&user.actor(), id).await?;
    Ok(NoContent)
}

/// Message history, newest first
#[utoipa::path(
    get,
    path = "/api/conversations/{id}/messages",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID"), PaginationParams),
    responses(
        (status = 200, description = "Page of messages", body = [ChatMessage]),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn history(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Paginated<ChatMessage>>> {
    Ok(Json(
        state
            .services
            .chat()
            .history(&user.actor(), id, &params)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/messages",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = MessageRequest,
    responses(
        (status = 201, description = "Message sent", body = ChatMessage),
        (status = 400, description = "Empty or oversized body"),
        (status = 404, description = "Conversation not found")
    )
)]
pub async fn send_message(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<MessageRequest>,
) -> AppResult<Created<ChatMessage>> {
    let message = state
        .services
        .chat()
        .send_message(&user.actor(), id, payload.body)
        .await?;
    Ok(Created(message))
}

#[utoipa::path(
    put,
    path = "/api/conversations/{id}/messages/{message_id}",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Conversation ID"),
        ("message_id" = Uuid, Path, description = "Message ID")
    ),
    request_body = MessageRequest,
    responses(
        (status = 200, description = "Message edited", body = ChatMessage),
        (status = 403, description = "Not the sender"),
        (status = 409, description = "Message was deleted")
    )
)]
pub async fn edit_message(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<MessageRequest>,
) -> AppResult<Json<ChatMessage>> {
    Ok(Json(
        state
            .services
            .chat()
            .edit_message(&user.actor(), id, message_id, payload.body)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/conversations/{id}/messages/{message_id}",
    tag = "Messaging",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Conversation ID"),
        ("message_id" = Uuid, Path, description = "Message ID")
    ),
    responses(
        (status = 204, description = "Message deleted"),
        (status = 403, description = "Not the sender")
    )
)]
pub async fn delete_message(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> AppResult<NoContent> {
    state
        .services
        .chat()
        .delete_message(&user.actor(), id, message_id)
        .await?;
    Ok(NoContent)
}
