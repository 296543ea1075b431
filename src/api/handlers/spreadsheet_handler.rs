//! Spreadsheet handlers.

use axum::{
    extract::{Extension, Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Json, Response},
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
use crate::domain::{CellUpdate, Spreadsheet};
use crate::errors::AppResult;
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateSheetRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    #[schema(example = "Budget 2025")]
    pub name: String,
    #[schema(example = 50)]
    pub rows: i32,
    #[schema(example = 10)]
    pub cols: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameSheetRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResizeSheetRequest {
    pub rows: i32,
    pub cols: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetCellsRequest {
    pub updates: Vec<CellUpdate>,
}

pub fn spreadsheet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sheets).post(create_sheet))
        .route("/:id", get(get_sheet).delete(delete_sheet))
        .route("/:id/name", put(rename_sheet))
        .route("/:id/size", put(resize_sheet))
        .route("/:id/cells", post(set_cells))
        .route("/:id/export.csv", get(export_csv))
}

/// File name safe for a Content-Disposition header
fn attachment_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "sheet".to_string()
    } else {
        cleaned.to_string()
    }
}

#[utoipa::path(
    get,
    path = "/api/spreadsheets",
    tag = "Spreadsheets",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Sheets visible to the caller", body = [Spreadsheet]))
)]
pub async fn list_sheets(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Spreadsheet>>> {
    Ok(Json(
        state.services.spreadsheets().list_sheets(&user.actor()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/spreadsheets",
    tag = "Spreadsheets",
    security(("bearer_auth" = [])),
    request_body = CreateSheetRequest,
    responses(
        (status = 201, description = "Sheet created", body = Spreadsheet),
        (status = 400, description = "Invalid name or dimensions")
    )
)]
pub async fn create_sheet(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateSheetRequest>,
) -> AppResult<Created<Spreadsheet>> {
    let sheet = state
        .services
        .spreadsheets()
        .create_sheet(&user.actor(), payload.name, payload.rows, payload.cols)
        .await?;
    Ok(Created(sheet))
}

#[utoipa::path(
    get,
    path = "/api/spreadsheets/{id}",
    tag = "Spreadsheets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sheet ID")),
    responses(
        (status = 200, description = "Sheet with cells", body = Spreadsheet),
        (status = 404, description = "Sheet not found")
    )
)]
pub async fn get_sheet(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Spreadsheet>> {
    Ok(Json(
        state.services.spreadsheets().get_sheet(&user.actor(), id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/spreadsheets/{id}/name",
    tag = "Spreadsheets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sheet ID")),
    request_body = RenameSheetRequest,
    responses((status = 200, description = "Sheet renamed", body = Spreadsheet))
)]
pub async fn rename_sheet(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<RenameSheetRequest>,
) -> AppResult<Json<Spreadsheet>> {
    Ok(Json(
        state
            .services
            .spreadsheets()
            .rename_sheet(&user.actor(), id, payload.name)
            .await?,
    ))
}

/// Resize the grid; cells outside the new bounds are dropped
#[utoipa::path(
    put,
    path = "/api/spreadsheets/{id}/size",
    tag = "Spreadsheets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sheet ID")),
    request_body = ResizeSheetRequest,
    responses(
        (status = 200, description = "Sheet resized", body = Spreadsheet),
        (status = 400, description = "Dimensions out of range")
    )
)]
pub async fn resize_sheet(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResizeSheetRequest>,
) -> AppResult<Json<Spreadsheet>> {
    Ok(Json(
        state
            .services
            .spreadsheets()
            .resize_sheet(&user.actor(), id, payload.rows, payload.cols)
            .await?,
    ))
}

/// Write a batch of cells; the whole batch fails on any bad address
#[utoipa::path(
    post,
    path = "/api/spreadsheets/{id}/cells",
    tag = "Spreadsheets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sheet ID")),
    request_body = SetCellsRequest,
    responses(
        (status = 200, description = "Cells written", body = Spreadsheet),
        (status = 400, description = "Address malformed or outside the grid")
    )
)]
pub async fn set_cells(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetCellsRequest>,
) -> AppResult<Json<Spreadsheet>> {
    Ok(Json(
        state
            .services
            .spreadsheets()
            .set_cells(&user.actor(), id, payload.updates)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/spreadsheets/{id}",
    tag = "Spreadsheets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sheet ID")),
    responses(
        (status = 204, description = "Sheet deleted"),
        (status = 403, description = "Only the owner or an admin may delete")
    )
)]
pub async fn delete_sheet(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state
        .services
        .spreadsheets()
        .delete_sheet(&user.actor(), id)
        .await?;
    Ok(NoContent)
}

#[utoipa::path(
    get,
    path = "/api/spreadsheets/{id}/export.csv",
    tag = "Spreadsheets",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Sheet ID")),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 404, description = "Sheet not found")
    )
)]
pub async fn export_csv(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let (name, csv) = state
        .services
        .spreadsheets()
        .export_csv(&user.actor(), id)
        .await?;

    let disposition = format!("attachment; filename=\"{}.csv\"", attachment_name(&name));
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_name_strips_header_breakers() {
        assert_eq!(attachment_name("Q3 \"final\"\r\n"), "Q3 _final___");
        assert_eq!(attachment_name("budget-2025.v2"), "budget-2025.v2");
        assert_eq!(attachment_name("   "), "sheet");
    }
}
