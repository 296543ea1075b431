//! Notification inbox and the WebSocket push channel.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Path, Query, State,
    },
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::Notification;
use crate::errors::AppResult;
use crate::services::NotificationService;
use crate::types::{NoContent, Paginated, PaginationParams};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InboxFilter {
    /// Only notifications not yet read
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAllResponse {
    pub updated: u64,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
        .route("/ws", get(push_socket))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(InboxFilter, PaginationParams),
    responses((status = 200, description = "Page of notifications, newest first", body = [Notification]))
)]
pub async fn list_notifications(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(filter): Query<InboxFilter>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Paginated<Notification>>> {
    Ok(Json(
        state
            .services
            .notifications()
            .list(&user.actor(), filter.unread_only, &params)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn mark_read(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .services
        .notifications()
        .mark_read(&user.actor(), id)
        .await?;
    Ok(NoContent)
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Unread notifications marked read", body = MarkAllResponse))
)]
pub async fn mark_all_read(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<MarkAllResponse>> {
    let updated = state
        .services
        .notifications()
        .mark_all_read(&user.actor())
        .await?;
    Ok(Json(MarkAllResponse { updated }))
}

/// Live event stream; each event is one JSON text frame
#[utoipa::path(
    get,
    path = "/api/notifications/ws",
    tag = "Notifications",
    security(("bearer_auth" = [])),
    responses((status = 101, description = "Switching to WebSocket"))
)]
pub async fn push_socket(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Response {
    let notifications = state.services.notifications();
    ws.on_upgrade(move |socket| stream_events(socket, user.id, notifications))
}

async fn stream_events(
    socket: WebSocket,
    user_id: Uuid,
    notifications: Arc<dyn NotificationService>,
) {
    let mut events = notifications.subscribe(user_id);
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(user_id = %user_id, "Push socket opened");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to encode push event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "Push socket lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // clients only listen; pings are answered by the protocol layer
                Some(Ok(_)) => {}
            },
        }
    }

    drop(events);
    notifications.disconnect(user_id);
    tracing::debug!(user_id = %user_id, "Push socket closed");
}
