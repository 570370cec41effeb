use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::patch::Patch;
use super::{new_id, Store};

/// An assistant instance bound to a workspace and, optionally, a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceAgent {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub summary: String,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub task_description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAgent {
    pub workspace_id: String,
    pub name: String,
    pub summary: String,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub task_description: Option<String>,
}

/// `workspace_id` is fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub task_id: Option<Option<String>>,
    pub task_name: Option<Option<String>>,
    pub task_description: Option<Option<String>>,
}

const COLUMNS: &str = "id, workspace_id, name, summary, task_id, task_name, task_description";

fn map_row(row: &Row) -> rusqlite::Result<WorkspaceAgent> {
    Ok(WorkspaceAgent {
        id: row.get(0)?,
        workspace_id: row.get(1)?,
        name: row.get(2)?,
        summary: row.get(3)?,
        task_id: row.get(4)?,
        task_name: row.get(5)?,
        task_description: row.get(6)?,
    })
}

pub struct AgentRepo {
    store: Store,
}

impl AgentRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn query(&self, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<WorkspaceAgent>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM workspace_agents {} ORDER BY name COLLATE NOCASE, id",
                COLUMNS, filter
            ))?;
            let rows = stmt.query_map(args, map_row)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn get_all(&self) -> Result<Vec<WorkspaceAgent>> {
        self.query("", params![])
    }

    pub fn get_by_workspace(&self, workspace_id: &str) -> Result<Vec<WorkspaceAgent>> {
        self.query("WHERE workspace_id = ?", params![workspace_id])
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<WorkspaceAgent>> {
        self.store.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM workspace_agents WHERE id = ?", COLUMNS),
                [id],
                map_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    #[instrument(skip(self, new), fields(workspace_id = %new.workspace_id, name = %new.name))]
    pub fn add(&self, new: NewAgent) -> Result<WorkspaceAgent> {
        let agent = WorkspaceAgent {
            id: new_id(),
            workspace_id: new.workspace_id,
            name: new.name,
            summary: new.summary,
            task_id: new.task_id,
            task_name: new.task_name,
            task_description: new.task_description,
        };

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workspace_agents (id, workspace_id, name, summary, task_id,
                     task_name, task_description)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
                params![
                    agent.id,
                    agent.workspace_id,
                    agent.name,
                    agent.summary,
                    agent.task_id,
                    agent.task_name,
                    agent.task_description,
                ],
            )?;
            Ok(())
        })?;

        Ok(agent)
    }

    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: AgentUpdate) -> Result<bool> {
        let mut patch = Patch::new();
        patch
            .set("name", update.name)
            .set("summary", update.summary)
            .set_nullable("task_id", update.task_id)
            .set_nullable("task_name", update.task_name)
            .set_nullable("task_description", update.task_description);

        self.store
            .with_conn(|conn| patch.apply(conn, "workspace_agents", id))
    }

    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<bool> {
        self.store.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM workspace_agents WHERE id = ?", [id])?;
            Ok(removed > 0)
        })
    }

    /// Remove every agent of a workspace. Returns how many were deleted.
    #[instrument(skip(self))]
    pub fn remove_by_workspace(&self, workspace_id: &str) -> Result<usize> {
        self.store.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM workspace_agents WHERE workspace_id = ?",
                [workspace_id],
            )?;
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(workspace_id: &str, name: &str) -> NewAgent {
        NewAgent {
            workspace_id: workspace_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn remove_by_workspace_leaves_other_workspaces() {
        let repo = AgentRepo::new(Store::open_in_memory().unwrap());
        repo.add(agent("w1", "planner")).unwrap();
        repo.add(agent("w1", "coder")).unwrap();
        let other = repo.add(agent("w2", "reviewer")).unwrap();

        assert_eq!(repo.remove_by_workspace("w1").unwrap(), 2);
        assert!(repo.get_by_workspace("w1").unwrap().is_empty());
        assert_eq!(repo.get_by_workspace("w2").unwrap(), vec![other]);
    }

    #[test]
    fn update_binds_task() {
        let repo = AgentRepo::new(Store::open_in_memory().unwrap());
        let added = repo.add(agent("w1", "coder")).unwrap();
        repo.update(
            &added.id,
            AgentUpdate {
                task_id: Some(Some("k1".into())),
                task_name: Some(Some("Write design doc".into())),
                ..Default::default()
            },
        )
        .unwrap();

        let loaded = repo.get_by_id(&added.id).unwrap().unwrap();
        assert_eq!(loaded.task_id.as_deref(), Some("k1"));
        assert_eq!(loaded.task_name.as_deref(), Some("Write design doc"));
        assert_eq!(loaded.workspace_id, "w1");
    }

    #[test]
    fn agents_ordered_by_name() {
        let repo = AgentRepo::new(Store::open_in_memory().unwrap());
        repo.add(agent("w1", "zeta")).unwrap();
        repo.add(agent("w1", "alpha")).unwrap();
        let names: Vec<String> = repo.get_all().unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
