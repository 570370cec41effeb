//! Tool integrations
//!
//! Tokens are sealed by [`SecretStore`] before they reach the table and
//! opened on the way out, so callers only ever handle plaintext. A token that
//! no longer decrypts reads back as empty.

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension, Row, ToSql};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use super::patch::Patch;
use super::{json_column, new_id, Store};
use crate::secrets::SecretStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ToolType {
    Vscode,
    Cursor,
    Github,
    Jira,
    Devops,
    Mcp,
    Rag,
    Other(String),
}

impl ToolType {
    pub fn as_str(&self) -> &str {
        match self {
            ToolType::Vscode => "vscode",
            ToolType::Cursor => "cursor",
            ToolType::Github => "github",
            ToolType::Jira => "jira",
            ToolType::Devops => "devops",
            ToolType::Mcp => "mcp",
            ToolType::Rag => "rag",
            ToolType::Other(other) => other,
        }
    }

    /// Editors can be opened through the launcher.
    pub fn is_editor(&self) -> bool {
        matches!(self, ToolType::Vscode | ToolType::Cursor)
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ToolType> for String {
    fn from(tool_type: ToolType) -> Self {
        tool_type.as_str().to_string()
    }
}

impl TryFrom<String> for ToolType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::str::FromStr for ToolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err("tool type must not be empty".to_string());
        }
        Ok(match s {
            "vscode" => ToolType::Vscode,
            "cursor" => ToolType::Cursor,
            "github" => ToolType::Github,
            "jira" => ToolType::Jira,
            "devops" => ToolType::Devops,
            "mcp" => ToolType::Mcp,
            "rag" => ToolType::Rag,
            other => ToolType::Other(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub title: String,
    pub description: String,
    pub is_enabled: bool,
    pub tool_type: ToolType,
    pub prompt: String,
    pub local_path: String,
    /// Plaintext; only ever stored encrypted
    #[serde(default, skip_serializing)]
    pub token: String,
    pub use_github_token: bool,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct NewTool {
    pub title: String,
    pub description: String,
    pub is_enabled: bool,
    pub tool_type: ToolType,
    pub prompt: String,
    pub local_path: String,
    pub token: String,
    pub use_github_token: bool,
    pub extra: Map<String, Value>,
}

impl NewTool {
    pub fn new(title: impl Into<String>, tool_type: ToolType) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            is_enabled: true,
            tool_type,
            prompt: String::new(),
            local_path: String::new(),
            token: String::new(),
            use_github_token: false,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_enabled: Option<bool>,
    pub tool_type: Option<ToolType>,
    pub prompt: Option<String>,
    pub local_path: Option<String>,
    pub token: Option<String>,
    pub use_github_token: Option<bool>,
    pub extra: Option<Map<String, Value>>,
}

/// Rows inserted into an empty `tools` table: (id, title, type, description).
pub const SEED_CATALOG: &[(&str, &str, &str, &str)] = &[
    ("tool-vscode", "VS Code", "vscode", "Open workspaces in Visual Studio Code"),
    ("tool-cursor", "Cursor", "cursor", "Open workspaces in Cursor"),
    ("tool-github", "GitHub", "github", "Sync issues and projects from GitHub"),
    ("tool-jira", "Jira", "jira", "Sync issues from Jira"),
    ("tool-devops", "Azure DevOps", "devops", "Sync work items from Azure DevOps"),
    ("tool-mcp", "MCP Server", "mcp", "Expose a Model Context Protocol server to the assistant"),
    ("tool-rag", "RAG Connector", "rag", "Retrieve documents for the assistant"),
];

const COLUMNS: &str = "id, title, description, is_enabled, tool_type, prompt, local_path,
                       token, use_github_token, extra";

pub struct ToolRepo {
    store: Store,
    secrets: SecretStore,
}

impl ToolRepo {
    /// Open the repository, seeding the catalog if the table is empty.
    pub fn new(store: Store, secrets: SecretStore) -> Result<Self> {
        let repo = Self { store, secrets };
        repo.seed_if_empty()?;
        Ok(repo)
    }

    fn seed_if_empty(&self) -> Result<()> {
        self.store.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM tools", [], |row| row.get(0))?;
            if count > 0 {
                return Ok(());
            }

            for (id, title, tool_type, description) in SEED_CATALOG {
                conn.execute(
                    "INSERT INTO tools (id, title, description, is_enabled, tool_type, prompt,
                         local_path, token, use_github_token, extra)
                     VALUES (?, ?, ?, 1, ?, '', '', '', 0, '{}')",
                    params![id, title, description, tool_type],
                )?;
            }
            info!(count = SEED_CATALOG.len(), "seeded tool catalog");
            Ok(())
        })
    }

    fn map_row(&self, row: &Row) -> rusqlite::Result<Tool> {
        let token: String = row.get(7)?;
        Ok(Tool {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            is_enabled: row.get(3)?,
            tool_type: super::parse_column(row, 4)?,
            prompt: row.get(5)?,
            local_path: row.get(6)?,
            token: self.secrets.decrypt_or_empty(&token),
            use_github_token: row.get(8)?,
            extra: json_column(row, 9)?,
        })
    }

    fn query(&self, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<Tool>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tools {} ORDER BY title COLLATE NOCASE",
                COLUMNS, filter
            ))?;
            let rows = stmt.query_map(args, |row| self.map_row(row))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    pub fn get_all(&self) -> Result<Vec<Tool>> {
        self.query("", params![])
    }

    pub fn get_enabled(&self) -> Result<Vec<Tool>> {
        self.query("WHERE is_enabled = 1", params![])
    }

    pub fn get_by_type(&self, tool_type: &ToolType) -> Result<Vec<Tool>> {
        self.query("WHERE tool_type = ?", params![tool_type.as_str()])
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Tool>> {
        self.store.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM tools WHERE id = ?", COLUMNS),
                [id],
                |row| self.map_row(row),
            )
            .optional()
            .map_err(Into::into)
        })
    }

    #[instrument(skip(self, new), fields(title = %new.title, tool_type = %new.tool_type))]
    pub fn add(&self, new: NewTool) -> Result<Tool> {
        let sealed = self
            .secrets
            .encrypt(&new.token)
            .context("encrypting tool token")?;
        let tool = Tool {
            id: new_id(),
            title: new.title,
            description: new.description,
            is_enabled: new.is_enabled,
            tool_type: new.tool_type,
            prompt: new.prompt,
            local_path: new.local_path,
            token: new.token,
            use_github_token: new.use_github_token,
            extra: new.extra,
        };

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tools (id, title, description, is_enabled, tool_type, prompt,
                     local_path, token, use_github_token, extra)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    tool.id,
                    tool.title,
                    tool.description,
                    tool.is_enabled,
                    tool.tool_type.as_str(),
                    tool.prompt,
                    tool.local_path,
                    sealed,
                    tool.use_github_token,
                    serde_json::to_string(&tool.extra)?,
                ],
            )?;
            Ok(())
        })?;

        Ok(tool)
    }

    #[instrument(skip(self, update))]
    pub fn update(&self, id: &str, update: ToolUpdate) -> Result<bool> {
        let token = match update.token {
            Some(plain) => Some(
                self.secrets
                    .encrypt(&plain)
                    .context("encrypting tool token")?,
            ),
            None => None,
        };

        let mut patch = Patch::new();
        patch
            .set("title", update.title)
            .set("description", update.description)
            .set("is_enabled", update.is_enabled)
            .set("tool_type", update.tool_type.map(|t| t.as_str().to_string()))
            .set("prompt", update.prompt)
            .set("local_path", update.local_path)
            .set("token", token)
            .set("use_github_token", update.use_github_token);
        patch.set_json("extra", update.extra.as_ref())?;

        self.store.with_conn(|conn| patch.apply(conn, "tools", id))
    }

    #[instrument(skip(self))]
    pub fn remove(&self, id: &str) -> Result<bool> {
        self.store.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM tools WHERE id = ?", [id])?;
            Ok(removed > 0)
        })
    }
}
