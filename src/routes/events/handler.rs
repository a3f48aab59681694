use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, ErrorKind},
    utils::{Claims, parse_iso_date},
};

use super::model::{Event, EventInfo, EventPatch, EventType, NewEvent};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub group_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub date: String,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub date: Option<String>,
    pub completed: Option<bool>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Query bounds are ISO-8601; an absent bound is unbounded on that side.
pub(super) fn parse_range(
    query: &DateRangeQuery,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), AppError> {
    let parse = |value: &Option<String>| -> Result<Option<DateTime<Utc>>, AppError> {
        match value {
            Some(s) => parse_iso_date(s)
                .map(Some)
                .ok_or_else(|| ErrorKind::ValidationDateInvalid.into()),
            None => Ok(None),
        }
    };
    Ok((parse(&query.start_date)?, parse(&query.end_date)?))
}

/// A blank assignee means "unassigned", never an empty-string user id.
fn parse_assignee(value: Option<&str>) -> Result<Option<Uuid>, AppError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| ErrorKind::ValidationUserIdInvalid.into()),
    }
}

#[axum::debug_handler]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventInfo>), AppError> {
    if req.title.trim().is_empty() {
        return Err(ErrorKind::EventTitleRequired.into());
    }
    let event_type =
        EventType::parse(&req.event_type).ok_or(ErrorKind::EventTypeInvalid)?;
    let date = parse_iso_date(&req.date).ok_or(ErrorKind::EventDateRequired)?;
    let assigned_to = parse_assignee(req.assigned_to.as_deref())?;

    let event = Event::create(
        &state.pool,
        req.group_id,
        claims.sub,
        NewEvent {
            title: req.title,
            description: req.description,
            event_type,
            date,
            assigned_to,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[axum::debug_handler]
pub async fn list_group_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<Vec<EventInfo>>, AppError> {
    let (start, end) = parse_range(&query)?;
    let events = Event::list_for_group(&state.pool, group_id, claims.sub, start, end).await?;
    Ok(Json(events))
}

#[axum::debug_handler]
pub async fn update_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<EventInfo>, AppError> {
    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(ErrorKind::EventTitleRequired.into());
        }
    }
    let event_type = match &req.event_type {
        Some(raw) => Some(EventType::parse(raw).ok_or(ErrorKind::EventTypeInvalid)?),
        None => None,
    };
    let date = match &req.date {
        Some(raw) => Some(parse_iso_date(raw).ok_or(ErrorKind::ValidationDateInvalid)?),
        None => None,
    };
    let assigned_to = match &req.assigned_to {
        Some(raw) => Some(parse_assignee(Some(raw))?),
        None => None,
    };

    let event = Event::update(
        &state.pool,
        id,
        claims.sub,
        EventPatch {
            title: req.title,
            description: req.description,
            event_type,
            date,
            completed: req.completed,
            assigned_to,
        },
    )
    .await?;
    Ok(Json(event))
}

#[axum::debug_handler]
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    Event::delete(&state.pool, id, claims.sub).await?;
    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_assignee_normalizes_to_absent() {
        assert_eq!(parse_assignee(None).unwrap(), None);
        assert_eq!(parse_assignee(Some("")).unwrap(), None);
        assert_eq!(parse_assignee(Some("   ")).unwrap(), None);

        let id = Uuid::new_v4();
        assert_eq!(parse_assignee(Some(&id.to_string())).unwrap(), Some(id));
    }

    #[test]
    fn malformed_assignee_reports_invalid_user_id() {
        let err = parse_assignee(Some("no-es-un-uuid")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationUserIdInvalid);
    }

    #[test]
    fn range_parsing_accepts_open_bounds() {
        let query = DateRangeQuery {
            start_date: Some("2024-01-01".into()),
            end_date: None,
        };
        let (start, end) = parse_range(&query).unwrap();
        assert!(start.is_some());
        assert!(end.is_none());

        let bad = DateRangeQuery {
            start_date: Some("ayer".into()),
            end_date: None,
        };
        assert!(parse_range(&bad).is_err());
    }
}
