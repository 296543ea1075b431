//! Calendar event handlers.

use axum::{
    extract::{Extension, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::double_option;
use crate::api::extractors::ValidatedJson;
use crate::api::middleware::CurrentUser;
use crate::api::AppState;
use crate::domain::{CalendarEvent, EventChanges, NewEvent, TimeWindow};
use crate::errors::AppResult;
use crate::types::{Created, NoContent};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    #[schema(example = "Quarterly planning")]
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    /// Minutes before the start to send a reminder (0-10080)
    #[validate(range(min = 0, max = 10080, message = "Reminder must be 0-10080 minutes"))]
    #[schema(example = 15)]
    pub remind_before_minutes: Option<i32>,
}

/// Partial update; `null` clears an optional field, omitted leaves it
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub remind_before_minutes: Option<Option<i32>>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventQuery {
    /// Only events ending at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Only events starting at or before this instant
    pub to: Option<DateTime<Utc>>,
    /// Another user's calendar (requires calendar.share)
    pub owner_id: Option<Uuid>,
}

impl From<CreateEventRequest> for NewEvent {
    fn from(r: CreateEventRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            location: r.location,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
            all_day: r.all_day,
            remind_before_minutes: r.remind_before_minutes,
        }
    }
}

impl From<UpdateEventRequest> for EventChanges {
    fn from(r: UpdateEventRequest) -> Self {
        Self {
            title: r.title,
            description: r.description,
            location: r.location,
            starts_at: r.starts_at,
            ends_at: r.ends_at,
            all_day: r.all_day,
            remind_before_minutes: r.remind_before_minutes,
        }
    }
}

pub fn calendar_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
}

#[utoipa::path(
    get,
    path = "/api/calendar/events",
    tag = "Calendar",
    security(("bearer_auth" = [])),
    params(EventQuery),
    responses(
        (status = 200, description = "Events overlapping the window", body = [CalendarEvent]),
        (status = 400, description = "'to' before 'from'"),
        (status = 403, description = "Calendar not shared with you")
    )
)]
pub async fn list_events(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> AppResult<Json<Vec<CalendarEvent>>> {
    let window = TimeWindow {
        from: query.from,
        to: query.to,
    };
    let events = state
        .services
        .calendar()
        .list_events(&user.actor(), query.owner_id, window)
        .await?;
    Ok(Json(events))
}

#[utoipa::path(
    post,
    path = "/api/calendar/events",
    tag = "Calendar",
    security(("bearer_auth" = [])),
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = CalendarEvent),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_event(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateEventRequest>,
) -> AppResult<Created<CalendarEvent>> {
    let event = state
        .services
        .calendar()
        .create_event(&user.actor(), payload.into())
        .await?;
    Ok(Created(event))
}

#[utoipa::path(
    get,
    path = "/api/calendar/events/{id}",
    tag = "Calendar",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event", body = CalendarEvent),
        (status = 404, description = "Event not found")
    )
)]
pub async fn get_event(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CalendarEvent>> {
    Ok(Json(
        state.services.calendar().get_event(&user.actor(), id).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/calendar/events/{id}",
    tag = "Calendar",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = CalendarEvent),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn update_event(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateEventRequest>,
) -> AppResult<Json<CalendarEvent>> {
    let event = state
        .services
        .calendar()
        .update_event(&user.actor(), id, payload.into())
        .await?;
    Ok(Json(event))
}

#[utoipa::path(
    delete,
    path = "/api/calendar/events/{id}",
    tag = "Calendar",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Event ID")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 404, description = "Event not found")
    )
)]
pub async fn delete_event(
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<NoContent> {
    state.services.calendar().delete_event(&user.actor(), id).await?;
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_missing() {
        let request: UpdateEventRequest =
            serde_json::from_str(r#"{"location": null, "title": "Standup"}"#).unwrap();
        assert_eq!(request.location, Some(None));
        assert_eq!(request.description, None);
        assert_eq!(request.remind_before_minutes, None);

        let changes = EventChanges::from(request);
        assert_eq!(changes.title.as_deref(), Some("Standup"));
        assert!(!changes.touches_schedule());
    }

    #[test]
    fn test_reminder_range_rule() {
        let request: CreateEventRequest = serde_json::from_str(
            r#"{"title":"Review","starts_at":"2030-01-01T10:00:00Z","ends_at":"2030-01-01T11:00:00Z","remind_before_minutes":20000}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());
    }
}
