//! Phone call handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::PhoneCallResponse;
use crate::errors::AppResult;
use crate::types::{Created, Paginated, PaginationParams};

#[derive(Debug, Deserialize, ToSchema)]
pub struct DialRequest {
    pub callee_id: Uuid,
}

pub fn phone_routes() -> Router<AppState> {
    Router::new()
        .route("/calls", get(call_history).post(dial))
        .route("/calls/:id", get(get_call))
        .route("/calls/:id/answer", post(answer))
        .route("/calls/:id/reject", post(reject))
        .route("/calls/:id/hangup", post(hang_up))
}

#[utoipa::path(
    post,
    path = "/api/phone/calls",
    tag = "Phone",
    security(("bearer_auth" = [])),
    request_body = DialRequest,
    responses(
        (status = 201, description = "Call ringing", body = PhoneCallResponse),
        (status = 400, description = "Calling yourself"),
        (status = 403, description = "Missing phone.call or callee not reachable"),
        (status = 409, description = "Callee or caller already on a call")
    )
)]
pub async fn dial(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(payload): Json<DialRequest>,
) -> AppResult<Created<PhoneCallResponse>> {
    let call = state
        .services
        .phone()
        .dial(&user.actor(), payload.callee_id)
        .await?;
    Ok(Created(call))
}

#[utoipa::path(
    get,
    path = "/api/phone/calls",
    tag = "Phone",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses((status = 200, description = "Calls involving the caller, newest first", body = [PhoneCallResponse]))
)]
pub async fn call_history(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Paginated<PhoneCallResponse>>> {
    Ok(Json(
        state.services.phone().history(&user.actor(), &params).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/phone/calls/{id}",
    tag = "Phone",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call", body = PhoneCallResponse),
        (status = 404, description = "Call not found")
    )
)]
pub async fn get_call(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PhoneCallResponse>> {
    Ok(Json(state.services.phone().get_call(&user.actor(), id).await?))
}

#[utoipa::path(
    post,
    path = "/api/phone/calls/{id}/answer",
    tag = "Phone",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call active", body = PhoneCallResponse),
        (status = 400, description = "Call is not ringing"),
        (status = 403, description = "Only the callee may answer")
    )
)]
pub async fn answer(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PhoneCallResponse>> {
    Ok(Json(state.services.phone().answer(&user.actor(), id).await?))
}

#[utoipa::path(
    post,
    path = "/api/phone/calls/{id}/reject",
    tag = "Phone",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call rejected", body = PhoneCallResponse),
        (status = 400, description = "Call is not ringing")
    )
)]
pub async fn reject(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PhoneCallResponse>> {
    Ok(Json(state.services.phone().reject(&user.actor(), id).await?))
}

/// End the call; a ringing call becomes missed
#[utoipa::path(
    post,
    path = "/api/phone/calls/{id}/hangup",
    tag = "Phone",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call ended", body = PhoneCallResponse),
        (status = 400, description = "Call already finished")
    )
)]
pub async fn hang_up(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PhoneCallResponse>> {
    Ok(Json(state.services.phone().hang_up(&user.actor(), id).await?))
}
