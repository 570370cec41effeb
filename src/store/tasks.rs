use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use super::patch::Patch;
use super::{json_column, new_id, now, parse_column, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub external_id: Option<String>,
    pub tool_id: Option<String>,
    pub status: TaskStatus,
    pub notes: String,
    pub last_updated_at: String,
    pub workspace_id: Option<String>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub external_id: Option<String>,
    pub tool_id: Option<String>,
    pub status: TaskStatus,
    pub notes: String,
    pub workspace_id: Option<String>,
    pub extra: Map<String, Value>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            external_id: None,
            tool_id: None,
            status: TaskStatus::Pending,
            notes: String::new(),
            workspace_id: None,
            extra: Map::new(),
        }
    }
}

/// Mutable task fields. Any non-empty update also stamps `last_updated_at`.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub external_id: Option<Option<String>>,
    pub tool_id: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub notes: Option<String>,
    pub workspace_id: Option<Option<String>>,
    pub extra: Option<Map<String, Value>>,
}

const COLUMNS: &str = "id, title, description, external_id, tool_id, status, notes,
                       last_updated_at, workspace_id, extra";

fn map_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        external_id: row.get(3)?,
        tool_id: row.get(4)?,
        status: parse_column(row, 5)?,
        notes: row.get(6)?,
        last_updated_at: row.get(7)?,
        workspace_id: row.get(8)?,
        extra: json_column(row, 9)?,
    })
}

pub struct TaskRepo {
    store: Store,
}

impl TaskRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn query(&self, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<Task>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks {} ORDER BY last_updated_at DESC, title",
                COLUMNS, filter
            ))?;
            let rows = stmt.query_map(args, map_row)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    /// All tasks, most recently updated first.
    pub fn get_all(&self) -> Result<Vec<Task>> {
        self.query("", params![])
    }

    pub fn get_by_workspace(&self, workspace_id: &str) -> Result<Vec<Task>> {
        self.query("WHERE workspace_id = ?", params![workspace_id])
    }

    pub fn get_by_tool(&self, tool_id: &str) -> Result<Vec<Task>> {
        self.query("WHERE tool_id = ?", params![tool_id])
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Task>> {
        self.store.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?", COLUMNS),
                [id],
                map_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    #[instrument(skip(self, new), fields(title = %new.title))]
    pub fn add(&self, new: NewTask) -> Result<Task> {
        let task = Task {
            id: new_id(),
            title: new.title,
            description: new.description,
            external_id: new.external_id,
            tool_id: new.tool_id,
            status: new.status,
            notes: new.notes,
            last_updated_at: now(),
            workspace_id: new.workspace_id,
            extra: new.extra,
        };

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, title, description, external_id, tool_id, status,
                     notes, last_updated_at, workspace_id, extra)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.external_id,
                    task.tool_id,
                    task.status.as_str(),
                    task.notes,
                    task.last_updated_at,
                    task.workspace_id,
                    serde_json::to_string(&task.extra)?,
                ],
            )?;
            Ok(())
        })?;

        Ok(task)
    }

    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: TaskUpdate) -> Result<bool> {
        let mut patch = Patch::new();
        patch
            .set("title", update.title)
            .set("description", update.description)
            .set_nullable("external_id", update.external_id)
            .set_nullable("tool_id", update.tool_id)
            .set("status", update.status.map(|s| s.as_str().to_string()))
            .set("notes", update.notes)
            .set_nullable("workspace_id", update.workspace_id);
        patch.set_json("extra", update.extra.as_ref())?;
        patch.touch("last_updated_at", now());

        self.store.with_conn(|conn| patch.apply(conn, "tasks", id))
    }

    pub fn set_status(&self, id: &str, status: TaskStatus) -> Result<bool> {
        self.update(
            id,
            TaskUpdate {
                status: Some(status),
                ..Default::default()
            },
        )
    }

    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<bool> {
        self.store.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM tasks WHERE id = ?", [id])?;
            Ok(removed > 0)
        })
    }
}
