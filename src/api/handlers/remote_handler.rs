//! Remote desktop session handlers.
//!
//! Input and frames are relayed over the recipient's push socket; the HTTP
//! response only reports how many sockets the relay reached.

use axum::{
    extract::{DefaultBodyLimit, Extension, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::config::MAX_REMOTE_FRAME_BYTES;
use crate::domain::{Frame, InputEvent, RemoteSession};
use crate::errors::AppResult;
use crate::types::Created;

/// Room for the JSON envelope around the base64 image
const FRAME_ENVELOPE_BYTES: usize = 4 * 1024;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionRequest {
    /// User whose screen will be controlled
    pub host_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RelayResponse {
    /// Sockets the event reached; zero when the peer is offline
    pub delivered: usize,
}

pub fn remote_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(request_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/accept", post(accept_session))
        .route("/sessions/:id/reject", post(reject_session))
        .route("/sessions/:id/close", post(close_session))
        .route("/sessions/:id/input", post(send_input))
        .route(
            "/sessions/:id/frame",
            post(send_frame).layer(DefaultBodyLimit::max(
                MAX_REMOTE_FRAME_BYTES + FRAME_ENVELOPE_BYTES,
            )),
        )
}

#[utoipa::path(
    get,
    path = "/api/remote/sessions",
    tag = "Remote desktop",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Sessions involving the caller", body = [RemoteSession]))
)]
pub async fn list_sessions(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<RemoteSession>>> {
    Ok(Json(state.services.remote().list_sessions(&user.actor()).await?))
}

/// Ask another user for control of their screen
#[utoipa::path(
    post,
    path = "/api/remote/sessions",
    tag = "Remote desktop",
    security(("bearer_auth" = [])),
    request_body = SessionRequest,
    responses(
        (status = 201, description = "Session pending", body = RemoteSession),
        (status = 400, description = "Host is the caller"),
        (status = 403, description = "Missing remote.control or host not reachable")
    )
)]
pub async fn request_session(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(payload): Json<SessionRequest>,
) -> AppResult<Created<RemoteSession>> {
    let session = state
        .services
        .remote()
        .request_session(&user.actor(), payload.host_id)
        .await?;
    Ok(Created(session))
}

#[utoipa::path(
    get,
    path = "/api/remote/sessions/{id}",
    tag = "Remote desktop",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session", body = RemoteSession),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RemoteSession>> {
    Ok(Json(state.services.remote().get_session(&user.actor(), id).await?))
}

#[utoipa::path(
    post,
    path = "/api/remote/sessions/{id}/accept",
    tag = "Remote desktop",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session active", body = RemoteSession),
        (status = 400, description = "Session is not pending"),
        (status = 403, description = "Only the host may accept")
    )
)]
pub async fn accept_session(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RemoteSession>> {
    Ok(Json(
        state.services.remote().accept_session(&user.actor(), id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/remote/sessions/{id}/reject",
    tag = "Remote desktop",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session rejected", body = RemoteSession),
        (status = 403, description = "Only the host may reject")
    )
)]
pub async fn reject_session(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RemoteSession>> {
    Ok(Json(
        state.services.remote().reject_session(&user.actor(), id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/remote/sessions/{id}/close",
    tag = "Remote desktop",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session closed", body = RemoteSession),
        (status = 400, description = "Session already finished")
    )
)]
pub async fn close_session(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RemoteSession>> {
    Ok(Json(
        state.services.remote().close_session(&user.actor(), id).await?,
    ))
}

/// Relay a mouse or keyboard event to the host (controller only)
#[utoipa::path(
    post,
    path = "/api/remote/sessions/{id}/input",
    tag = "Remote desktop",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = InputEvent,
    responses(
        (status = 200, description = "Event relayed", body = RelayResponse),
        (status = 400, description = "Session not active or event out of bounds"),
        (status = 403, description = "Only the controller sends input")
    )
)]
pub async fn send_input(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(event): Json<InputEvent>,
) -> AppResult<Json<RelayResponse>> {
    let delivered = state
        .services
        .remote()
        .send_input(&user.actor(), id, event)
        .await?;
    Ok(Json(RelayResponse { delivered }))
}

/// Relay a captured screen frame to the controller (host only)
#[utoipa::path(
    post,
    path = "/api/remote/sessions/{id}/frame",
    tag = "Remote desktop",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = Frame,
    responses(
        (status = 200, description = "Frame relayed", body = RelayResponse),
        (status = 400, description = "Session not active or frame invalid"),
        (status = 403, description = "Only the host sends frames")
    )
)]
pub async fn send_frame(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(frame): Json<Frame>,
) -> AppResult<Json<RelayResponse>> {
    let delivered = state
        .services
        .remote()
        .send_frame(&user.actor(), id, frame)
        .await?;
    Ok(Json(RelayResponse { delivered }))
}
