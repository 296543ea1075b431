//! Org unit, membership, grant and communication-link handlers, plus the
//! permission lookups under `/api/permissions`.

use axum::{
    extract::{Extension, Path, State},
    response::Json,
    routing::{delete, get},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::double_option;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{CommunicationLink, Permission, Unit, UnitGrant, UserResponse};
use crate::errors::AppResult;
use crate::services::{parallel, UnitChanges};
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUnitRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    #[schema(example = "Engineering")]
    pub name: String,
    /// Parent unit; omit for a top-level unit
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUnitRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    /// New parent; `null` moves the unit to the top level, omitted leaves it
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantRequest {
    #[schema(example = "calendar.share")]
    pub permission: Permission,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLinkRequest {
    pub source_unit_id: Uuid,
    pub target_unit_id: Uuid,
    /// Allow traffic in both directions
    #[serde(default)]
    pub bidirectional: bool,
}

/// Caller's own permissions and units
#[derive(Debug, Serialize, ToSchema)]
pub struct MyPermissionsResponse {
    pub permissions: Vec<Permission>,
    pub units: Vec<Unit>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionCheckResponse {
    pub permission: Permission,
    pub granted: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReachabilityResponse {
    pub user_id: Uuid,
    pub reachable: bool,
}

pub fn unit_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_units).post(create_unit))
        .route("/links", get(list_links).post(create_link))
        .route("/links/:id", delete(delete_link))
        .route("/of/:user_id", get(units_of_user))
        .route("/:id", get(get_unit).put(update_unit).delete(delete_unit))
        .route("/:id/ancestors", get(unit_ancestors))
        .route("/:id/subtree", get(unit_subtree))
        .route("/:id/members", get(list_members).post(add_member))
        .route("/:id/members/:user_id", delete(remove_member))
        .route("/:id/permissions", get(list_grants).post(grant_permission))
        .route("/:id/permissions/:permission", delete(revoke_permission))
}

pub fn permission_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(permission_catalogue))
        .route("/me", get(my_permissions))
        .route("/check/:permission", get(check_permission))
        .route("/users/:id", get(user_permissions))
        .route("/reachable/:user_id", get(reachable))
}

#[utoipa::path(
    get,
    path = "/api/units",
    tag = "Units",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Units of the tenant", body = [Unit]))
)]
pub async fn list_units(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Unit>>> {
    Ok(Json(state.services.units().list_units(&user.actor()).await?))
}

#[utoipa::path(
    post,
    path = "/api/units",
    tag = "Units",
    security(("bearer_auth" = [])),
    request_body = CreateUnitRequest,
    responses(
        (status = 201, description = "Unit created", body = Unit),
        (status = 400, description = "Validation error or unknown parent"),
        (status = 403, description = "Requires units.manage")
    )
)]
pub async fn create_unit(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUnitRequest>,
) -> AppResult<Created<Unit>> {
    let unit = state
        .services
        .units()
        .create_unit(&user.actor(), payload.name, payload.parent_id)
        .await?;
    Ok(Created(unit))
}

#[utoipa::path(
    get,
    path = "/api/units/{id}",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 200, description = "Unit", body = Unit),
        (status = 404, description = "Unit not found")
    )
)]
pub async fn get_unit(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Unit>> {
    Ok(Json(state.services.units().get_unit(&user.actor(), id).await?))
}

/// Rename and/or move a unit
#[utoipa::path(
    put,
    path = "/api/units/{id}",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    request_body = UpdateUnitRequest,
    responses(
        (status = 200, description = "Unit updated", body = Unit),
        (status = 400, description = "Invalid parent (self, cycle or unknown)"),
        (status = 403, description = "Requires units.manage"),
        (status = 404, description = "Unit not found")
    )
)]
pub async fn update_unit(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUnitRequest>,
) -> AppResult<Json<Unit>> {
    let unit = state
        .services
        .units()
        .update_unit(
            &user.actor(),
            id,
            UnitChanges {
                name: payload.name,
                parent_id: payload.parent_id,
            },
        )
        .await?;
    Ok(Json(unit))
}

#[utoipa::path(
    delete,
    path = "/api/units/{id}",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses(
        (status = 204, description = "Unit deleted"),
        (status = 403, description = "Requires units.manage"),
        (status = 404, description = "Unit not found"),
        (status = 409, description = "Unit still has child units")
    )
)]
pub async fn delete_unit(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.units().delete_unit(&user.actor(), id).await?;
    Ok(NoContent)
}

/// Ancestors of a unit, nearest first
#[utoipa::path(
    get,
    path = "/api/units/{id}/ancestors",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses((status = 200, description = "Ancestor chain", body = [Unit]))
)]
pub async fn unit_ancestors(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Unit>>> {
    Ok(Json(state.services.units().ancestors(&user.actor(), id).await?))
}

#[utoipa::path(
    get,
    path = "/api/units/{id}/subtree",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses((status = 200, description = "All descendants", body = [Unit]))
)]
pub async fn unit_subtree(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Unit>>> {
    Ok(Json(state.services.units().subtree(&user.actor(), id).await?))
}

#[utoipa::path(
    get,
    path = "/api/units/{id}/members",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses((status = 200, description = "Unit members", body = [UserResponse]))
)]
pub async fn list_members(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let members = state.services.units().members(&user.actor(), id).await?;
    Ok(Json(members.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/units/{id}/members",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    request_body = AddMemberRequest,
    responses(
        (status = 204, description = "Member added"),
        (status = 404, description = "Unit or user not found"),
        (status = 409, description = "Already a member")
    )
)]
pub async fn add_member(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddMemberRequest>,
) -> AppResult<NoContent> {
    state
        .services
        .units()
        .add_member(&user.actor(), id, payload.user_id)
        .await?;
    Ok(NoContent)
}

#[utoipa::path(
    delete,
    path = "/api/units/{id}/members/{user_id}",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Unit ID"),
        ("user_id" = Uuid, Path, description = "Member to remove")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 404, description = "Not a member")
    )
)]
pub async fn remove_member(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<NoContent> {
    state
        .services
        .units()
        .remove_member(&user.actor(), id, user_id)
        .await?;
    Ok(NoContent)
}

/// Units a user belongs to
#[utoipa::path(
    get,
    path = "/api/units/of/{user_id}",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Units of the user", body = [Unit]))
)]
pub async fn units_of_user(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<Unit>>> {
    Ok(Json(
        state.services.units().units_of(&user.actor(), user_id).await?,
    ))
}

/// Permissions granted directly on a unit
#[utoipa::path(
    get,
    path = "/api/units/{id}/permissions",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    responses((status = 200, description = "Grants on the unit", body = [UnitGrant]))
)]
pub async fn list_grants(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<UnitGrant>>> {
    Ok(Json(state.services.units().permissions(&user.actor(), id).await?))
}

#[utoipa::path(
    post,
    path = "/api/units/{id}/permissions",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Unit ID")),
    request_body = GrantRequest,
    responses(
        (status = 201, description = "Permission granted", body = UnitGrant),
        (status = 409, description = "Already granted")
    )
)]
pub async fn grant_permission(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GrantRequest>,
) -> AppResult<Created<UnitGrant>> {
    let grant = state
        .services
        .units()
        .grant(&user.actor(), id, payload.permission)
        .await?;
    Ok(Created(grant))
}

#[utoipa::path(
    delete,
    path = "/api/units/{id}/permissions/{permission}",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Unit ID"),
        ("permission" = String, Path, description = "Permission name, e.g. calendar.share")
    ),
    responses(
        (status = 204, description = "Permission revoked"),
        (status = 400, description = "Unknown permission"),
        (status = 404, description = "Not granted")
    )
)]
pub async fn revoke_permission(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path((id, permission)): Path<(Uuid, String)>,
) -> AppResult<NoContent> {
    let permission: Permission = permission.parse()?;
    state
        .services
        .units()
        .revoke(&user.actor(), id, permission)
        .await?;
    Ok(NoContent)
}

#[utoipa::path(
    get,
    path = "/api/units/links",
    tag = "Units",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Communication links", body = [CommunicationLink]))
)]
pub async fn list_links(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CommunicationLink>>> {
    Ok(Json(state.services.units().links(&user.actor()).await?))
}

/// Allow members of one unit subtree to reach another
#[utoipa::path(
    post,
    path = "/api/units/links",
    tag = "Units",
    security(("bearer_auth" = [])),
    request_body = CreateLinkRequest,
    responses(
        (status = 201, description = "Link created", body = CommunicationLink),
        (status = 400, description = "Self-link or unknown unit"),
        (status = 409, description = "Link already exists")
    )
)]
pub async fn create_link(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(payload): Json<CreateLinkRequest>,
) -> AppResult<Created<CommunicationLink>> {
    let link = state
        .services
        .units()
        .link(
            &user.actor(),
            payload.source_unit_id,
            payload.target_unit_id,
            payload.bidirectional,
        )
        .await?;
    Ok(Created(link))
}

#[utoipa::path(
    delete,
    path = "/api/units/links/{id}",
    tag = "Units",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Link ID")),
    responses(
        (status = 204, description = "Link removed"),
        (status = 404, description = "Link not found")
    )
)]
pub async fn delete_link(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.units().unlink(&user.actor(), id).await?;
    Ok(NoContent)
}

/// Every permission name a unit can be granted
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Permission catalogue", body = [Permission]))
)]
pub async fn permission_catalogue() -> Json<Vec<Permission>> {
    Json(Permission::ALL.to_vec())
}

#[utoipa::path(
    get,
    path = "/api/permissions/me",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Caller's effective permissions", body = MyPermissionsResponse))
)]
pub async fn my_permissions(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<MyPermissionsResponse>> {
    let actor = user.actor();
    let units = state.services.units();
    let (permissions, my_units) = parallel::join2(
        units.effective_permissions(&actor, actor.user_id),
        units.units_of(&actor, actor.user_id),
    )
    .await?;

    Ok(Json(MyPermissionsResponse {
        permissions,
        units: my_units,
    }))
}

#[utoipa::path(
    get,
    path = "/api/permissions/check/{permission}",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    params(("permission" = String, Path, description = "Permission name")),
    responses(
        (status = 200, description = "Whether the caller holds it", body = PermissionCheckResponse),
        (status = 400, description = "Unknown permission")
    )
)]
pub async fn check_permission(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(permission): Path<String>,
) -> AppResult<Json<PermissionCheckResponse>> {
    let permission: Permission = permission.parse()?;
    let granted = state
        .services
        .units()
        .has_permission(&user.actor(), permission)
        .await?;
    Ok(Json(PermissionCheckResponse { permission, granted }))
}

/// Effective permissions of another user (self or admin)
#[utoipa::path(
    get,
    path = "/api/permissions/users/{id}",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Effective permissions", body = [Permission]),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn user_permissions(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Permission>>> {
    Ok(Json(
        state
            .services
            .units()
            .effective_permissions(&user.actor(), id)
            .await?,
    ))
}

/// Whether the org rules let the caller contact a user
#[utoipa::path(
    get,
    path = "/api/permissions/reachable/{user_id}",
    tag = "Permissions",
    security(("bearer_auth" = [])),
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Reachability", body = ReachabilityResponse))
)]
pub async fn reachable(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ReachabilityResponse>> {
    let reachable = state
        .services
        .units()
        .can_communicate(&user.actor(), user_id)
        .await?;
    Ok(Json(ReachabilityResponse { user_id, reachable }))
}
