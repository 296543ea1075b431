//! User handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{UpdateUser, UserResponse};
use crate::errors::AppResult;
use crate::types::{NoContent, Paginated, PaginationParams};

/// User update request with validation
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    /// New display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    #[schema(example = "Jane Doe")]
    pub name: Option<String>,
    /// New role (admin only)
    #[schema(example = "admin")]
    pub role: Option<String>,
}

/// Create user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_current_user))
        .route("/deleted", get(list_deleted_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/restore", post(restore_user))
}

/// Get current authenticated user
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_current_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    if let Some(user) = state.cache.get_user(&current_user.id).await? {
        return Ok(Json(user));
    }

    let user = state
        .services
        .users()
        .get_user(&current_user.actor(), current_user.id)
        .await?;
    let profile = UserResponse::from(user);

    // a cache outage only costs a database read
    if let Err(e) = state.cache.set_user(&profile).await {
        tracing::warn!(user_id = %profile.id, error = %e, "Failed to cache profile");
    }

    Ok(Json(profile))
}

/// Page through the tenant's users (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(PaginationParams),
    responses(
        (status = 200, description = "Page of users", body = [UserResponse]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_users(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<Paginated<UserResponse>>> {
    let page = state
        .services
        .users()
        .list_users(&current_user.actor(), &params)
        .await?;
    Ok(Json(page.map(UserResponse::from)))
}

/// List soft-deleted users (admin only)
#[utoipa::path(
    get,
    path = "/api/users/deleted",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deleted users", body = [UserResponse]),
        (status = 403, description = "Forbidden - Admin only")
    )
)]
pub async fn list_deleted_users(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = state
        .services
        .users()
        .list_deleted_users(&current_user.actor())
        .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Get user by ID (own profile or admin)
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Can only view own profile unless admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .services
        .users()
        .get_user(&current_user.actor(), id)
        .await?;
    Ok(Json(UserResponse::from(user)))
}

/// Update user (own profile, or admin for role changes)
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Can only update own profile unless admin"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .services
        .users()
        .update_user(
            &current_user.actor(),
            id,
            UpdateUser {
                name: payload.name,
                role: payload.role,
            },
        )
        .await?;

    state.cache.invalidate_user(&id).await?;

    Ok(Json(UserResponse::from(user)))
}

/// Soft delete a user (admin only, cannot delete self)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted successfully"),
        (status = 400, description = "Cannot delete your own account"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .services
        .users()
        .delete_user(&current_user.actor(), id)
        .await?;

    state.cache.invalidate_user(&id).await?;

    Ok(NoContent)
}

/// Restore soft-deleted user (admin only)
#[utoipa::path(
    post,
    path = "/api/users/{id}/restore",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "User ID to restore")
    ),
    responses(
        (status = 200, description = "User restored successfully", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin only"),
        (status = 404, description = "User not found or not deleted")
    )
)]
pub async fn restore_user(
    Extension(current_user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state
        .services
        .users()
        .restore_user(&current_user.actor(), id)
        .await?;

    state.cache.invalidate_user(&id).await?;

    Ok(Json(UserResponse::from(user)))
}
