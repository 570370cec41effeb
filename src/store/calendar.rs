//! Calendar events shown next to tasks and offered to the assistant

use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::patch::Patch;
use super::{new_id, now, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    /// RFC 3339
    pub start_at: String,
    pub end_at: Option<String>,
    pub all_day: bool,
    pub location: Option<String>,
    pub workspace_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewCalendarEvent {
    pub title: String,
    pub description: String,
    pub start_at: String,
    pub end_at: Option<String>,
    pub all_day: bool,
    pub location: Option<String>,
    pub workspace_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CalendarEventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: Option<String>,
    pub end_at: Option<Option<String>>,
    pub all_day: Option<bool>,
    pub location: Option<Option<String>>,
    pub workspace_id: Option<Option<String>>,
}

const COLUMNS: &str =
    "id, title, description, start_at, end_at, all_day, location, workspace_id, created_at";

fn map_row(row: &Row) -> rusqlite::Result<CalendarEvent> {
    Ok(CalendarEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_at: row.get(3)?,
        end_at: row.get(4)?,
        all_day: row.get(5)?,
        location: row.get(6)?,
        workspace_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub struct CalendarRepo {
    store: Store,
}

impl CalendarRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn query(&self, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<CalendarEvent>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM calendar_events {} ORDER BY start_at, title",
                COLUMNS, filter
            ))?;
            let rows = stmt.query_map(args, map_row)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn get_all(&self) -> Result<Vec<CalendarEvent>> {
        self.query("", params![])
    }

    /// Events starting in `[from, to)`. Bounds compare as RFC 3339 text.
    pub fn get_between(&self, from: &str, to: &str) -> Result<Vec<CalendarEvent>> {
        self.query("WHERE start_at >= ? AND start_at < ?", params![from, to])
    }

    pub fn get_by_workspace(&self, workspace_id: &str) -> Result<Vec<CalendarEvent>> {
        self.query("WHERE workspace_id = ?", params![workspace_id])
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<CalendarEvent>> {
        self.store.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM calendar_events WHERE id = ?", COLUMNS),
                [id],
                map_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    pub fn add(&self, new: NewCalendarEvent) -> Result<CalendarEvent> {
        let event = CalendarEvent {
            id: new_id(),
            title: new.title,
            description: new.description,
            start_at: new.start_at,
            end_at: new.end_at,
            all_day: new.all_day,
            location: new.location,
            workspace_id: new.workspace_id,
            created_at: now(),
        };

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO calendar_events (id, title, description, start_at, end_at,
                     all_day, location, workspace_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    event.id,
                    event.title,
                    event.description,
                    event.start_at,
                    event.end_at,
                    event.all_day,
                    event.location,
                    event.workspace_id,
                    event.created_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(event)
    }

    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: CalendarEventUpdate) -> Result<bool> {
        let mut patch = Patch::new();
        patch
            .set("title", update.title)
            .set("description", update.description)
            .set("start_at", update.start_at)
            .set_nullable("end_at", update.end_at)
            .set("all_day", update.all_day)
            .set_nullable("location", update.location)
            .set_nullable("workspace_id", update.workspace_id);

        self.store
            .with_conn(|conn| patch.apply(conn, "calendar_events", id))
    }

    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<bool> {
        self.store.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM calendar_events WHERE id = ?", [id])?;
            Ok(removed > 0)
        })
    }
}
