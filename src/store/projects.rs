use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::patch::Patch;
use super::{new_id, now, parse_column, Store};

/// Where a project is synchronised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    GithubProject,
    GithubIssues,
    DevOps,
    Jira,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::GithubProject => "GithubProject",
            ProjectType::GithubIssues => "GithubIssues",
            ProjectType::DevOps => "DevOps",
            ProjectType::Jira => "Jira",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GithubProject" => Ok(ProjectType::GithubProject),
            "GithubIssues" => Ok(ProjectType::GithubIssues),
            "DevOps" => Ok(ProjectType::DevOps),
            "Jira" => Ok(ProjectType::Jira),
            other => Err(format!("unknown project type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub external_id: String,
    pub tool_id: Option<String>,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub last_sync: Option<String>,
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub external_id: String,
    pub tool_id: Option<String>,
    pub project_type: ProjectType,
    pub organization_id: Option<String>,
    pub organization_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub tool_id: Option<Option<String>>,
    pub project_type: Option<ProjectType>,
    pub last_sync: Option<Option<String>>,
    pub organization_id: Option<Option<String>>,
    pub organization_name: Option<Option<String>>,
}

const COLUMNS: &str =
    "id, name, external_id, tool_id, type, last_sync, organization_id, organization_name";

fn map_row(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        external_id: row.get(2)?,
        tool_id: row.get(3)?,
        project_type: parse_column(row, 4)?,
        last_sync: row.get(5)?,
        organization_id: row.get(6)?,
        organization_name: row.get(7)?,
    })
}

pub struct ProjectRepo {
    store: Store,
}

impl ProjectRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn query(&self, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<Project>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM projects {} ORDER BY name COLLATE NOCASE",
                COLUMNS, filter
            ))?;
            let rows = stmt.query_map(args, map_row)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn get_all(&self) -> Result<Vec<Project>> {
        self.query("", params![])
    }

    pub fn get_by_tool(&self, tool_id: &str) -> Result<Vec<Project>> {
        self.query("WHERE tool_id = ?", params![tool_id])
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Project>> {
        self.store.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM projects WHERE id = ?", COLUMNS),
                [id],
                map_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    #[instrument(skip(self, new), fields(name = %new.name, project_type = %new.project_type))]
    pub fn add(&self, new: NewProject) -> Result<Project> {
        let project = Project {
            id: new_id(),
            name: new.name,
            external_id: new.external_id,
            tool_id: new.tool_id,
            project_type: new.project_type,
            last_sync: None,
            organization_id: new.organization_id,
            organization_name: new.organization_name,
        };

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, name, external_id, tool_id, type, last_sync,
                     organization_id, organization_name)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    project.id,
                    project.name,
                    project.external_id,
                    project.tool_id,
                    project.project_type.as_str(),
                    project.last_sync,
                    project.organization_id,
                    project.organization_name,
                ],
            )?;
            Ok(())
        })?;

        Ok(project)
    }

    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: ProjectUpdate) -> Result<bool> {
        let mut patch = Patch::new();
        patch
            .set("name", update.name)
            .set("external_id", update.external_id)
            .set_nullable("tool_id", update.tool_id)
            .set("type", update.project_type.map(|t| t.as_str().to_string()))
            .set_nullable("last_sync", update.last_sync)
            .set_nullable("organization_id", update.organization_id)
            .set_nullable("organization_name", update.organization_name);

        self.store.with_conn(|conn| patch.apply(conn, "projects", id))
    }

    /// Record a successful sync at the current time.
    pub fn mark_synced(&self, id: &str) -> Result<bool> {
        self.update(
            id,
            ProjectUpdate {
                last_sync: Some(Some(now())),
                ..Default::default()
            },
        )
    }

    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<bool> {
        self.store.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM projects WHERE id = ?", [id])?;
            Ok(removed > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_project(name: &str, tool: &str, project_type: ProjectType) -> NewProject {
        NewProject {
            name: name.into(),
            external_id: format!("ext-{name}"),
            tool_id: Some(tool.into()),
            project_type,
            organization_id: None,
            organization_name: None,
        }
    }

    #[test]
    fn add_get_and_filter_by_tool() {
        let repo = ProjectRepo::new(Store::open_in_memory().unwrap());
        let board = repo
            .add(new_project("Board", "tool-github", ProjectType::GithubProject))
            .unwrap();
        repo.add(new_project("Sprint", "tool-jira", ProjectType::Jira))
            .unwrap();

        assert_eq!(repo.get_by_id(&board.id).unwrap().unwrap(), board);
        let github = repo.get_by_tool("tool-github").unwrap();
        assert_eq!(github.len(), 1);
        assert_eq!(github[0].project_type, ProjectType::GithubProject);
        assert_eq!(repo.get_all().unwrap().len(), 2);
    }

    #[test]
    fn mark_synced_sets_last_sync() {
        let repo = ProjectRepo::new(Store::open_in_memory().unwrap());
        let project = repo
            .add(new_project("Ops", "tool-devops", ProjectType::DevOps))
            .unwrap();
        assert!(project.last_sync.is_none());
        assert!(repo.mark_synced(&project.id).unwrap());
        assert!(repo.get_by_id(&project.id).unwrap().unwrap().last_sync.is_some());
    }

    #[test]
    fn project_type_serialises_with_original_names() {
        let json = serde_json::to_value(ProjectType::GithubIssues).unwrap();
        assert_eq!(json, serde_json::json!("GithubIssues"));
        assert!("Trello".parse::<ProjectType>().is_err());
    }
}
