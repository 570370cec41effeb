use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use super::patch::Patch;
use super::{json_column, new_id, now, Store};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub folder_path: String,
    pub description: String,
    pub editor_tool_id: Option<String>,
    pub task_tool_id: Option<String>,
    pub task_tool_external_id: Option<String>,
    /// Tool ids bound to this workspace
    pub tools: Vec<String>,
    pub extra: Map<String, Value>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewWorkspace {
    pub name: String,
    pub folder_path: String,
    pub description: String,
    pub editor_tool_id: Option<String>,
    pub task_tool_id: Option<String>,
    pub task_tool_external_id: Option<String>,
    pub tools: Vec<String>,
    pub extra: Map<String, Value>,
}

/// Mutable workspace fields. `id` and `created_at` are fixed.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceUpdate {
    pub name: Option<String>,
    pub folder_path: Option<String>,
    pub description: Option<String>,
    pub editor_tool_id: Option<Option<String>>,
    pub task_tool_id: Option<Option<String>>,
    pub task_tool_external_id: Option<Option<String>>,
    pub tools: Option<Vec<String>>,
    pub extra: Option<Map<String, Value>>,
}

const COLUMNS: &str = "id, name, folder_path, description, editor_tool_id, task_tool_id,
                       task_tool_external_id, tools, extra, created_at";

fn map_row(row: &Row) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        id: row.get(0)?,
        name: row.get(1)?,
        folder_path: row.get(2)?,
        description: row.get(3)?,
        editor_tool_id: row.get(4)?,
        task_tool_id: row.get(5)?,
        task_tool_external_id: row.get(6)?,
        tools: json_column(row, 7)?,
        extra: json_column(row, 8)?,
        created_at: row.get(9)?,
    })
}

pub struct WorkspaceRepo {
    store: Store,
}

impl WorkspaceRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// All workspaces, by name.
    pub fn get_all(&self) -> Result<Vec<Workspace>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM workspaces ORDER BY name COLLATE NOCASE, created_at",
                COLUMNS
            ))?;
            let rows = stmt.query_map([], map_row)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Workspace>> {
        self.store.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM workspaces WHERE id = ?", COLUMNS),
                [id],
                map_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn add(&self, new: NewWorkspace) -> Result<Workspace> {
        let workspace = Workspace {
            id: new_id(),
            name: new.name,
            folder_path: new.folder_path,
            description: new.description,
            editor_tool_id: new.editor_tool_id,
            task_tool_id: new.task_tool_id,
            task_tool_external_id: new.task_tool_external_id,
            tools: new.tools,
            extra: new.extra,
            created_at: now(),
        };

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workspaces (id, name, folder_path, description, editor_tool_id,
                     task_tool_id, task_tool_external_id, tools, extra, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    workspace.id,
                    workspace.name,
                    workspace.folder_path,
                    workspace.description,
                    workspace.editor_tool_id,
                    workspace.task_tool_id,
                    workspace.task_tool_external_id,
                    serde_json::to_string(&workspace.tools)?,
                    serde_json::to_string(&workspace.extra)?,
                    workspace.created_at,
                ],
            )?;
            Ok(())
        })?;

        tracing::debug!(id = %workspace.id, "workspace added");
        Ok(workspace)
    }

    /// Apply a partial update. Returns `false` when nothing was written.
    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: WorkspaceUpdate) -> Result<bool> {
        let mut patch = Patch::new();
        patch
            .set("name", update.name)
            .set("folder_path", update.folder_path)
            .set("description", update.description)
            .set_nullable("editor_tool_id", update.editor_tool_id)
            .set_nullable("task_tool_id", update.task_tool_id)
            .set_nullable("task_tool_external_id", update.task_tool_external_id);
        patch.set_json("tools", update.tools.as_ref())?;
        patch.set_json("extra", update.extra.as_ref())?;

        self.store.with_conn(|conn| patch.apply(conn, "workspaces", id))
    }

    /// Hard delete. Agents bound to the workspace are the caller's to remove.
    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<bool> {
        self.store.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM workspaces WHERE id = ?", [id])?;
            Ok(removed > 0)
        })
    }
}
