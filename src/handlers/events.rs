use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{AuthUser, ADMIN_ONLY, STAFF};
use crate::models::{Event, EventStatus};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{Ack, Page};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventPayload {
    pub title: Option<String>,
    pub category: Option<String>,
    pub capacity: Option<i32>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub poster: Option<String>,
    pub materials: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventPayload {
    pub title: Option<String>,
    pub category: Option<String>,
    pub capacity: Option<i32>,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub poster: Option<String>,
    pub materials: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: Option<String>,
}

pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEventPayload>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    user.require(STAFF)?;

    let new_event = validate_create(payload).map_err(AppError::validation)?;

    // Organizer id comes from the verified token, never the body, and
    // every event starts out pending.
    let event = sqlx::query_as::<_, Event>(
        "INSERT INTO events
           (id, title, category, capacity, start_at, end_at, venue,
            description, poster, materials, status, organizer_id,
            created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending', $11, now(), now())
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&new_event.title)
    .bind(&new_event.category)
    .bind(new_event.capacity)
    .bind(new_event.start_at)
    .bind(new_event.end_at)
    .bind(&new_event.venue)
    .bind(&new_event.description)
    .bind(&new_event.poster)
    .bind(&new_event.materials)
    .bind(user.id)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(event_id = %event.id, organizer_id = %user.id, "event created");

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Event>>, AppError> {
    let filter = normalize_list_query(query).map_err(AppError::validation)?;

    let status = filter.status.map(|s| s.as_str().to_string());
    let search = filter.search.as_deref().map(escape_like);
    let offset = (filter.page - 1) * filter.limit;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM events
         WHERE ($1::text IS NULL OR status = $1)
           AND ($2::text IS NULL OR category = $2)
           AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%')",
    )
    .bind(&status)
    .bind(&filter.category)
    .bind(&search)
    .fetch_one(&state.db)
    .await?;

    let data = sqlx::query_as::<_, Event>(
        "SELECT * FROM events
         WHERE ($1::text IS NULL OR status = $1)
           AND ($2::text IS NULL OR category = $2)
           AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%')
         ORDER BY created_at DESC
         LIMIT $4 OFFSET $5",
    )
    .bind(&status)
    .bind(&filter.category)
    .bind(&search)
    .bind(filter.limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(Page {
        data,
        total,
        page: filter.page,
        limit: filter.limit,
    }))
}

pub async fn get_event(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, AppError> {
    let event = fetch_event(&state, id).await?;
    Ok(Json(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventPayload>,
) -> Result<Json<Event>, AppError> {
    user.require(STAFF)?;

    let existing = fetch_event(&state, id).await?;
    if !can_modify(&user, existing.organizer_id) {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    let changes = validate_update(payload).map_err(AppError::validation)?;

    // An organizer edit sends the event back through approval; an admin
    // edit leaves the current status in place.
    let status = if user.is_admin() {
        existing.status
    } else {
        EventStatus::Pending
    };

    let event = sqlx::query_as::<_, Event>(
        "UPDATE events SET
           title = COALESCE($2, title),
           category = COALESCE($3, category),
           capacity = COALESCE($4, capacity),
           start_at = COALESCE($5, start_at),
           end_at = COALESCE($6, end_at),
           venue = COALESCE($7, venue),
           description = COALESCE($8, description),
           poster = COALESCE($9, poster),
           materials = COALESCE($10, materials),
           status = $11,
           updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&changes.title)
    .bind(&changes.category)
    .bind(changes.capacity)
    .bind(changes.start_at)
    .bind(changes.end_at)
    .bind(&changes.venue)
    .bind(&changes.description)
    .bind(&changes.poster)
    .bind(&changes.materials)
    .bind(status.as_str())
    .fetch_optional(&state.db)
    .await?;

    // The event can disappear between the ownership check and the
    // update; zero updated rows is a 404, not a server fault.
    Ok(Json(event_or_not_found(event)?))
}

pub async fn update_event_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Event>, AppError> {
    user.require(ADMIN_ONLY)?;

    let status: EventStatus = payload
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            AppError::Validation(vec![
                "status must be one of pending, approved, rejected".to_string(),
            ])
        })?;

    let event = sqlx::query_as::<_, Event>(
        "UPDATE events SET status = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(&state.db)
    .await?;
    let event = event_or_not_found(event)?;

    tracing::info!(event_id = %event.id, status = %status, "event status updated");

    Ok(Json(event))
}

pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Ack>, AppError> {
    user.require(STAFF)?;

    let existing = fetch_event(&state, id).await?;
    if !can_modify(&user, existing.organizer_id) {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }

    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    tracing::info!(event_id = %id, "event deleted");

    Ok(Json(Ack::ok()))
}

async fn fetch_event(state: &AppState, id: Uuid) -> Result<Event, AppError> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    event_or_not_found(event)
}

fn event_or_not_found<T>(row: Option<T>) -> Result<T, AppError> {
    row.ok_or_else(|| AppError::NotFound("Event not found".to_string()))
}

/// Owning organizer or any admin.
fn can_modify(user: &AuthUser, organizer_id: Uuid) -> bool {
    user.is_admin() || user.id == organizer_id
}

/// Makes `%`, `_` and `\` in a search term match literally inside the
/// ILIKE pattern.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(Debug)]
pub struct NewEvent {
    pub title: String,
    pub category: String,
    pub capacity: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub venue: String,
    pub description: Option<String>,
    pub poster: Option<String>,
    pub materials: Option<Vec<String>>,
}

pub struct EventChanges {
    pub title: Option<String>,
    pub category: Option<String>,
    pub capacity: Option<i32>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub description: Option<String>,
    pub poster: Option<String>,
    pub materials: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: i64,
    pub limit: i64,
}

fn validate_create(payload: CreateEventPayload) -> Result<NewEvent, Vec<String>> {
    let mut errors = Vec::new();

    let title = required_text("title", payload.title.as_deref(), &mut errors);
    let category = required_text("category", payload.category.as_deref(), &mut errors);
    let venue = required_text("venue", payload.venue.as_deref(), &mut errors);

    let capacity = match payload.capacity {
        Some(c) if c >= 1 => c,
        Some(_) => {
            errors.push("capacity must be at least 1".to_string());
            0
        }
        None => {
            errors.push("capacity is required".to_string());
            0
        }
    };

    let start_at = required_timestamp("startAt", payload.start_at.as_deref(), &mut errors);
    let end_at = required_timestamp("endAt", payload.end_at.as_deref(), &mut errors);

    match (start_at, end_at) {
        (Some(start_at), Some(end_at)) if errors.is_empty() => Ok(NewEvent {
            title,
            category,
            capacity,
            start_at,
            end_at,
            venue,
            description: payload.description,
            poster: payload.poster,
            materials: payload.materials,
        }),
        _ => Err(errors),
    }
}

fn validate_update(payload: UpdateEventPayload) -> Result<EventChanges, Vec<String>> {
    let mut errors = Vec::new();

    if let Some(c) = payload.capacity {
        if c < 1 {
            errors.push("capacity must be at least 1".to_string());
        }
    }

    let start_at = optional_timestamp("startAt", payload.start_at.as_deref(), &mut errors);
    let end_at = optional_timestamp("endAt", payload.end_at.as_deref(), &mut errors);

    if errors.is_empty() {
        Ok(EventChanges {
            title: payload.title,
            category: payload.category,
            capacity: payload.capacity,
            start_at,
            end_at,
            venue: payload.venue,
            description: payload.description,
            poster: payload.poster,
            materials: payload.materials,
        })
    } else {
        Err(errors)
    }
}

fn normalize_list_query(query: ListQuery) -> Result<EventFilter, Vec<String>> {
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => Some(s.parse::<EventStatus>().map_err(|_| {
            vec!["status must be one of pending, approved, rejected".to_string()]
        })?),
    };

    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    Ok(EventFilter {
        status,
        category: query.category,
        search: query.search,
        page,
        limit,
    })
}

fn required_text(field: &str, value: Option<&str>, errors: &mut Vec<String>) -> String {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => {
            errors.push(format!("{field} is required"));
            String::new()
        }
    }
}

fn required_timestamp(
    field: &str,
    value: Option<&str>,
    errors: &mut Vec<String>,
) -> Option<DateTime<Utc>> {
    match value {
        None => {
            errors.push(format!("{field} is required"));
            None
        }
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => {
                errors.push(format!("{field} must be an RFC 3339 timestamp"));
                None
            }
        },
    }
}

fn optional_timestamp(
    field: &str,
    value: Option<&str>,
    errors: &mut Vec<String>,
) -> Option<DateTime<Utc>> {
    value.and_then(|s| match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => {
            errors.push(format!("{field} must be an RFC 3339 timestamp"));
            None
        }
    })
}
