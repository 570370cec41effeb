//! Tools an assistant session can call
//!
//! Every tool is a read-only passthrough to one repository query and returns
//! a JSON array. A registry built without a repository answers the related
//! tools with `[]`.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::store::{AgentRepo, CalendarRepo, ProjectRepo, SyncLogRepo, TaskRepo, WorkspaceRepo};

/// Schema sent to the model for one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema object describing the arguments
    pub parameters: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },
}

const LIST_TASKS: &str = "list_tasks";
const LIST_TASKS_FOR_WORKSPACE: &str = "list_tasks_for_workspace";
const LIST_CALENDAR_EVENTS: &str = "list_calendar_events";
const LIST_WORKSPACES: &str = "list_workspaces";
const LIST_PROJECTS: &str = "list_projects";
const LIST_WORKSPACE_AGENTS: &str = "list_workspace_agents";
const LIST_SYNC_LOGS: &str = "list_sync_logs";

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

#[derive(Default)]
pub struct ToolRegistry {
    tasks: Option<TaskRepo>,
    calendar: Option<CalendarRepo>,
    workspaces: Option<WorkspaceRepo>,
    projects: Option<ProjectRepo>,
    agents: Option<AgentRepo>,
    sync_log: Option<SyncLogRepo>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(mut self, repo: TaskRepo) -> Self {
        self.tasks = Some(repo);
        self
    }

    pub fn with_calendar(mut self, repo: CalendarRepo) -> Self {
        self.calendar = Some(repo);
        self
    }

    pub fn with_workspaces(mut self, repo: WorkspaceRepo) -> Self {
        self.workspaces = Some(repo);
        self
    }

    pub fn with_projects(mut self, repo: ProjectRepo) -> Self {
        self.projects = Some(repo);
        self
    }

    pub fn with_agents(mut self, repo: AgentRepo) -> Self {
        self.agents = Some(repo);
        self
    }

    pub fn with_sync_log(mut self, repo: SyncLogRepo) -> Self {
        self.sync_log = Some(repo);
        self
    }

    /// Schemas for every tool, in a stable order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: LIST_TASKS.into(),
                description: "List all tasks across workspaces.".into(),
                parameters: no_arguments(),
            },
            ToolDefinition {
                name: LIST_TASKS_FOR_WORKSPACE.into(),
                description: "List the tasks assigned to one workspace.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "workspaceId": { "type": "string", "description": "Workspace id" }
                    },
                    "required": ["workspaceId"]
                }),
            },
            ToolDefinition {
                name: LIST_CALENDAR_EVENTS.into(),
                description: "List calendar events ordered by start time.".into(),
                parameters: no_arguments(),
            },
            ToolDefinition {
                name: LIST_WORKSPACES.into(),
                description: "List all workspaces and their folders.".into(),
                parameters: no_arguments(),
            },
            ToolDefinition {
                name: LIST_PROJECTS.into(),
                description: "List synced projects from GitHub, Jira and Azure DevOps.".into(),
                parameters: no_arguments(),
            },
            ToolDefinition {
                name: LIST_WORKSPACE_AGENTS.into(),
                description: "List workspace agents, optionally for one workspace.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "workspaceId": { "type": "string", "description": "Workspace id" }
                    }
                }),
            },
            ToolDefinition {
                name: LIST_SYNC_LOGS.into(),
                description: "List recent sync log entries, newest first.".into(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "toolId": { "type": "string", "description": "Only entries for this tool" },
                        "limit": { "type": "integer", "minimum": 1, "description": "Maximum entries" }
                    }
                }),
            },
        ]
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions().iter().any(|d| d.name == name)
    }

    /// Run one tool with the model-supplied arguments.
    pub fn call(&self, name: &str, args: &Value) -> Result<Value, ToolCallError> {
        debug!(tool = name, "tool call");
        match name {
            LIST_TASKS => run(name, self.tasks.as_ref(), |r| r.get_all()),
            LIST_TASKS_FOR_WORKSPACE => {
                let workspace_id = required_str(name, args, "workspaceId")?;
                run(name, self.tasks.as_ref(), |r| r.get_by_workspace(workspace_id))
            }
            LIST_CALENDAR_EVENTS => run(name, self.calendar.as_ref(), |r| r.get_all()),
            LIST_WORKSPACES => run(name, self.workspaces.as_ref(), |r| r.get_all()),
            LIST_PROJECTS => run(name, self.projects.as_ref(), |r| r.get_all()),
            LIST_WORKSPACE_AGENTS => {
                let workspace_id = optional_str(name, args, "workspaceId")?;
                run(name, self.agents.as_ref(), |r| match workspace_id {
                    Some(id) => r.get_by_workspace(id),
                    None => r.get_all(),
                })
            }
            LIST_SYNC_LOGS => {
                let tool_id = optional_str(name, args, "toolId")?;
                let limit = optional_limit(name, args)?;
                run(name, self.sync_log.as_ref(), |r| match tool_id {
                    Some(id) => r.recent_for_tool(id, limit),
                    None => r.recent(limit),
                })
            }
            _ => Err(ToolCallError::UnknownTool(name.to_string())),
        }
    }
}

fn run<R, T, F>(tool: &str, repo: Option<&R>, query: F) -> Result<Value, ToolCallError>
where
    T: Serialize,
    F: FnOnce(&R) -> anyhow::Result<Vec<T>>,
{
    let Some(repo) = repo else {
        return Ok(Value::Array(Vec::new()));
    };
    let rows = query(repo).map_err(|e| ToolCallError::Failed {
        tool: tool.to_string(),
        message: format!("{e:#}"),
    })?;
    serde_json::to_value(rows).map_err(|e| ToolCallError::Failed {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn optional_str<'a>(tool: &str, args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolCallError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ToolCallError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("{key} must be a string"),
        }),
    }
}

fn required_str<'a>(tool: &str, args: &'a Value, key: &str) -> Result<&'a str, ToolCallError> {
    optional_str(tool, args, key)?.ok_or_else(|| ToolCallError::InvalidArguments {
        tool: tool.to_string(),
        message: format!("{key} is required"),
    })
}

fn optional_limit(tool: &str, args: &Value) -> Result<Option<usize>, ToolCallError> {
    match args.get("limit") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .filter(|n| *n > 0)
            .map(|n| Some(n as usize))
            .ok_or_else(|| ToolCallError::InvalidArguments {
                tool: tool.to_string(),
                message: "limit must be a positive integer".into(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LogLevel, NewAgent, NewSyncLogEntry, NewTask, NewWorkspace, Store};

    fn wired(store: &Store) -> ToolRegistry {
        ToolRegistry::new()
            .with_tasks(TaskRepo::new(store.clone()))
            .with_calendar(CalendarRepo::new(store.clone()))
            .with_workspaces(WorkspaceRepo::new(store.clone()))
            .with_projects(ProjectRepo::new(store.clone()))
            .with_agents(AgentRepo::new(store.clone()))
            .with_sync_log(SyncLogRepo::new(store.clone()))
    }

    #[test]
    fn definitions_cover_all_tools() {
        let names: Vec<String> = ToolRegistry::new()
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "list_tasks",
                "list_tasks_for_workspace",
                "list_calendar_events",
                "list_workspaces",
                "list_projects",
                "list_workspace_agents",
                "list_sync_logs",
            ]
        );
    }

    #[test]
    fn unwired_repo_returns_empty_array() {
        let registry = ToolRegistry::new();
        assert_eq!(registry.call("list_tasks", &json!({})).unwrap(), json!([]));
        assert_eq!(registry.call("list_sync_logs", &json!({})).unwrap(), json!([]));
    }

    #[test]
    fn tasks_for_workspace() {
        let store = Store::open_in_memory().unwrap();
        let tasks = TaskRepo::new(store.clone());
        let mut mine = NewTask::new("Write design doc");
        mine.workspace_id = Some("w1".into());
        tasks.add(mine).unwrap();
        tasks.add(NewTask::new("Elsewhere")).unwrap();

        let registry = wired(&store);
        let result = registry
            .call("list_tasks_for_workspace", &json!({ "workspaceId": "w1" }))
            .unwrap();
        let rows = result.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "Write design doc");
        assert_eq!(rows[0]["status"], "pending");

        let all = registry.call("list_tasks", &Value::Null).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);
    }

    #[test]
    fn missing_required_argument() {
        let registry = wired(&Store::open_in_memory().unwrap());
        let err = registry
            .call("list_tasks_for_workspace", &json!({}))
            .unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments { .. }));
    }

    #[test]
    fn agents_filtered_by_optional_workspace() {
        let store = Store::open_in_memory().unwrap();
        let agents = AgentRepo::new(store.clone());
        for (ws, name) in [("w1", "alpha"), ("w2", "beta")] {
            agents
                .add(NewAgent {
                    workspace_id: ws.into(),
                    name: name.into(),
                    ..Default::default()
                })
                .unwrap();
        }

        let registry = wired(&store);
        let all = registry.call("list_workspace_agents", &json!({})).unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);
        let w2 = registry
            .call("list_workspace_agents", &json!({ "workspaceId": "w2" }))
            .unwrap();
        assert_eq!(w2[0]["name"], "beta");
    }

    #[test]
    fn sync_logs_respect_limit_and_tool() {
        let store = Store::open_in_memory().unwrap();
        let log = SyncLogRepo::new(store.clone());
        for i in 0..3 {
            log.append(NewSyncLogEntry::new("tool-github", LogLevel::Info, format!("sync {i}")))
                .unwrap();
        }
        log.append(NewSyncLogEntry::new("tool-jira", LogLevel::Error, "boom"))
            .unwrap();

        let registry = wired(&store);
        let limited = registry.call("list_sync_logs", &json!({ "limit": 2 })).unwrap();
        assert_eq!(limited.as_array().unwrap().len(), 2);

        let jira = registry
            .call("list_sync_logs", &json!({ "toolId": "tool-jira" }))
            .unwrap();
        assert_eq!(jira.as_array().unwrap().len(), 1);
        assert_eq!(jira[0]["level"], "error");

        assert!(registry.call("list_sync_logs", &json!({ "limit": 0 })).is_err());
    }

    #[test]
    fn workspaces_listed() {
        let store = Store::open_in_memory().unwrap();
        WorkspaceRepo::new(store.clone())
            .add(NewWorkspace {
                name: "devdesk".into(),
                folder_path: "/src/devdesk".into(),
                ..Default::default()
            })
            .unwrap();

        let result = wired(&store).call("list_workspaces", &json!({})).unwrap();
        assert_eq!(result[0]["folderPath"], "/src/devdesk");
    }

    #[test]
    fn unknown_tool() {
        let err = ToolRegistry::new().call("drop_tables", &json!({})).unwrap_err();
        assert!(matches!(err, ToolCallError::UnknownTool(name) if name == "drop_tables"));
    }
}
