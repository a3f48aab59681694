use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, ErrorKind};
use crate::policy::GroupAccess;
use crate::routes::groups::model::PersonRef;

/// The three kinds of calendar item a group tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Task,
    Event,
    Reminder,
}

impl EventType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TASK" => Some(Self::Task),
            "EVENT" => Some(Self::Event),
            "REMINDER" => Some(Self::Reminder),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "TASK",
            Self::Event => "EVENT",
            Self::Reminder => "REMINDER",
        }
    }
}

#[derive(Debug, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub group_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub date: DateTime<Utc>,
    pub completed: bool,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Event as served to clients, with creator and assignee resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    pub id: Uuid,
    pub group_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub date: DateTime<Utc>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub creator: PersonRef,
    pub assignee: Option<PersonRef>,
}

#[derive(Debug, FromRow)]
struct EventInfoRow {
    id: Uuid,
    group_id: Uuid,
    title: String,
    description: Option<String>,
    event_type: String,
    date: DateTime<Utc>,
    completed: bool,
    created_at: DateTime<Utc>,
    creator_id: Uuid,
    creator_name: String,
    creator_email: String,
    assigned_to: Option<Uuid>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}

impl From<EventInfoRow> for EventInfo {
    fn from(row: EventInfoRow) -> Self {
        let assignee = match (row.assigned_to, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(PersonRef { id, name, email }),
            _ => None,
        };
        Self {
            id: row.id,
            group_id: row.group_id,
            title: row.title,
            description: row.description,
            event_type: row.event_type,
            date: row.date,
            completed: row.completed,
            created_at: row.created_at,
            creator: PersonRef {
                id: row.creator_id,
                name: row.creator_name,
                email: row.creator_email,
            },
            assignee,
        }
    }
}

pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub date: DateTime<Utc>,
    pub assigned_to: Option<Uuid>,
}

/// Patch for an event. `assigned_to` distinguishes "leave as is" (`None`)
/// from "clear the assignment" (`Some(None)`).
#[derive(Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub event_type: Option<EventType>,
    pub date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub assigned_to: Option<Option<Uuid>>,
}

const INFO_SELECT: &str = "SELECT e.id, e.group_id, e.title, e.description, e.event_type, \
        e.date, e.completed, e.created_at, \
        c.id AS creator_id, c.name AS creator_name, c.email AS creator_email, \
        e.assigned_to, a.name AS assignee_name, a.email AS assignee_email \
     FROM events e \
     JOIN users c ON c.id = e.creator_id \
     LEFT JOIN users a ON a.id = e.assigned_to";

impl Event {
    pub async fn create(
        pool: &PgPool,
        group_id: Uuid,
        creator_id: Uuid,
        new: NewEvent,
    ) -> Result<EventInfo, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_member(creator_id) {
            return Err(ErrorKind::EventNotMember.into());
        }

        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO events (id, group_id, creator_id, title, description, event_type, date, assigned_to) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(group_id)
        .bind(creator_id)
        .bind(&new.title)
        .bind(new.description.as_deref())
        .bind(new.event_type.as_str())
        .bind(new.date)
        .bind(new.assigned_to)
        .fetch_one(pool)
        .await?;

        Self::fetch_info(pool, id).await
    }

    /// Group calendar in the inclusive date window, oldest first.
    pub async fn list_for_group(
        pool: &PgPool,
        group_id: Uuid,
        user_id: Uuid,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventInfo>, AppError> {
        let access = GroupAccess::load(pool, group_id)
            .await?
            .ok_or(ErrorKind::GroupNotFound)?;
        if !access.is_member(user_id) {
            return Err(ErrorKind::EventNotMember.into());
        }

        let rows: Vec<EventInfoRow> = sqlx::query_as(&format!(
            "{INFO_SELECT} \
             WHERE e.group_id = $1 \
               AND ($2::timestamptz IS NULL OR e.date >= $2) \
               AND ($3::timestamptz IS NULL OR e.date <= $3) \
             ORDER BY e.date ASC"
        ))
        .bind(group_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(EventInfo::from).collect())
    }

    /// Any member may update any field; only delete is restricted further.
    pub async fn update(
        pool: &PgPool,
        event_id: Uuid,
        user_id: Uuid,
        patch: EventPatch,
    ) -> Result<EventInfo, AppError> {
        let event = Self::fetch(pool, event_id)
            .await?
            .ok_or(ErrorKind::EventNotFound)?;
        let access = GroupAccess::load(pool, event.group_id)
            .await?
            .ok_or(ErrorKind::EventNotFound)?;
        if !access.is_member(user_id) {
            return Err(ErrorKind::EventNotMember.into());
        }

        let title = patch.title.unwrap_or(event.title);
        let description = patch.description.or(event.description);
        let event_type = patch
            .event_type
            .map(|t| t.as_str().to_string())
            .unwrap_or(event.event_type);
        // an unset date leaves the stored date untouched
        let date = patch.date.unwrap_or(event.date);
        let completed = patch.completed.unwrap_or(event.completed);
        let assigned_to = patch.assigned_to.unwrap_or(event.assigned_to);

        sqlx::query(
            "UPDATE events SET title = $2, description = $3, event_type = $4, date = $5, \
                    completed = $6, assigned_to = $7 \
             WHERE id = $1",
        )
        .bind(event_id)
        .bind(&title)
        .bind(description.as_deref())
        .bind(&event_type)
        .bind(date)
        .bind(completed)
        .bind(assigned_to)
        .execute(pool)
        .await?;

        Self::fetch_info(pool, event_id).await
    }

    pub async fn delete(pool: &PgPool, event_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let event = Self::fetch(pool, event_id)
            .await?
            .ok_or(ErrorKind::EventNotFound)?;
        let access = GroupAccess::load(pool, event.group_id)
            .await?
            .ok_or(ErrorKind::EventNotFound)?;
        // la pertenencia se comprueba antes que el permiso de borrado
        if !access.is_member(user_id) {
            return Err(ErrorKind::EventNotMember.into());
        }
        if !access.is_creator_or_owner(event.creator_id, user_id) {
            return Err(ErrorKind::EventOnlyCreatorOrOwnerCanDelete.into());
        }

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    async fn fetch(pool: &PgPool, event_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, group_id, creator_id, title, description, event_type, date, \
                    completed, assigned_to, created_at \
             FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(pool)
        .await
    }

    async fn fetch_info(pool: &PgPool, event_id: Uuid) -> Result<EventInfo, AppError> {
        let row: EventInfoRow = sqlx::query_as(&format!("{INFO_SELECT} WHERE e.id = $1"))
            .bind(event_id)
            .fetch_one(pool)
            .await?;
        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_parses_the_three_kinds() {
        assert_eq!(EventType::parse("TASK"), Some(EventType::Task));
        assert_eq!(EventType::parse("EVENT"), Some(EventType::Event));
        assert_eq!(EventType::parse("REMINDER"), Some(EventType::Reminder));
    }

    #[test]
    fn event_type_rejects_anything_else() {
        assert_eq!(EventType::parse("INVALID"), None);
        assert_eq!(EventType::parse("task"), None);
        assert_eq!(EventType::parse(""), None);
    }

    #[test]
    fn event_type_round_trips() {
        for kind in [EventType::Task, EventType::Event, EventType::Reminder] {
            assert_eq!(EventType::parse(kind.as_str()), Some(kind));
        }
    }
}
