//! SQLite schema definition
//!
//! No version table is kept. Older databases are recognised by their shape
//! (legacy table names, missing columns) and brought forward by
//! `TABLE_RENAMES` and `COLUMN_MIGRATIONS`.

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = OFF;
"#;

pub const SCHEMA: &str = r#"
-- ============================================
-- WORKSPACES
-- ============================================

CREATE TABLE IF NOT EXISTS workspaces (
    id TEXT PRIMARY KEY,                   -- UUID
    name TEXT NOT NULL,
    folder_path TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    editor_tool_id TEXT,
    task_tool_id TEXT,
    task_tool_external_id TEXT,
    tools TEXT NOT NULL DEFAULT '[]',      -- JSON array of tool ids
    extra TEXT NOT NULL DEFAULT '{}',      -- JSON object
    created_at TEXT NOT NULL
);

-- ============================================
-- TOOLS
-- ============================================

CREATE TABLE IF NOT EXISTS tools (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    is_enabled INTEGER NOT NULL DEFAULT 1,
    tool_type TEXT NOT NULL,               -- 'vscode', 'github', 'jira', 'mcp', ...
    prompt TEXT NOT NULL DEFAULT '',
    local_path TEXT NOT NULL DEFAULT '',
    token TEXT NOT NULL DEFAULT '',        -- nonce:tag:ciphertext, never plaintext
    use_github_token INTEGER NOT NULL DEFAULT 0,
    extra TEXT NOT NULL DEFAULT '{}'
);

-- ============================================
-- TASKS
-- ============================================

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    external_id TEXT,
    tool_id TEXT,
    status TEXT NOT NULL DEFAULT 'pending', -- 'pending', 'in_progress', 'done'
    notes TEXT NOT NULL DEFAULT '',
    last_updated_at TEXT NOT NULL,
    workspace_id TEXT,                     -- NULL = unassigned
    extra TEXT NOT NULL DEFAULT '{}'
);

-- ============================================
-- PROJECTS
-- ============================================

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    external_id TEXT NOT NULL DEFAULT '',
    tool_id TEXT,
    type TEXT NOT NULL,                    -- 'GithubProject', 'GithubIssues', 'DevOps', 'Jira'
    last_sync TEXT,
    organization_id TEXT,
    organization_name TEXT
);

-- ============================================
-- WORKSPACE AGENTS
-- ============================================

CREATE TABLE IF NOT EXISTS workspace_agents (
    id TEXT PRIMARY KEY,
    workspace_id TEXT NOT NULL,
    name TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    task_id TEXT,
    task_name TEXT,
    task_description TEXT
);

-- ============================================
-- SYNC LOG
-- ============================================

CREATE TABLE IF NOT EXISTS sync_log (
    id TEXT PRIMARY KEY,
    tool_id TEXT NOT NULL,
    project_external_id TEXT,
    project_title TEXT,
    level TEXT NOT NULL DEFAULT 'info',    -- 'info', 'warning', 'error'
    message TEXT NOT NULL,
    detail TEXT,
    created_at TEXT NOT NULL
);

-- ============================================
-- CALENDAR
-- ============================================

CREATE TABLE IF NOT EXISTS calendar_events (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    start_at TEXT NOT NULL,
    end_at TEXT,
    all_day INTEGER NOT NULL DEFAULT 0,
    location TEXT,
    workspace_id TEXT,
    created_at TEXT NOT NULL
);
"#;

/// Applied after column migrations so legacy tables have every indexed column.
pub const INDEXES: &[(&str, &str)] = &[
    ("idx_tasks_workspace", "CREATE INDEX IF NOT EXISTS idx_tasks_workspace ON tasks(workspace_id)"),
    ("idx_tasks_tool", "CREATE INDEX IF NOT EXISTS idx_tasks_tool ON tasks(tool_id)"),
    ("idx_projects_tool", "CREATE INDEX IF NOT EXISTS idx_projects_tool ON projects(tool_id)"),
    (
        "idx_agents_workspace",
        "CREATE INDEX IF NOT EXISTS idx_agents_workspace ON workspace_agents(workspace_id)",
    ),
    ("idx_sync_log_tool", "CREATE INDEX IF NOT EXISTS idx_sync_log_tool ON sync_log(tool_id)"),
    (
        "idx_sync_log_created",
        "CREATE INDEX IF NOT EXISTS idx_sync_log_created ON sync_log(created_at DESC)",
    ),
    (
        "idx_calendar_start",
        "CREATE INDEX IF NOT EXISTS idx_calendar_start ON calendar_events(start_at)",
    ),
];

/// Tables every initialised store carries.
pub const TABLES: &[&str] = &[
    "workspaces",
    "tools",
    "tasks",
    "projects",
    "workspace_agents",
    "sync_log",
    "calendar_events",
];

/// Legacy table name -> current name.
pub const TABLE_RENAMES: &[(&str, &str)] = &[
    ("integrations", "tools"),
    ("agents", "workspace_agents"),
];

/// A column introduced after the table's first release.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMigration {
    pub table: &'static str,
    pub column: &'static str,
    pub definition: &'static str,
}

const fn column(
    table: &'static str,
    column: &'static str,
    definition: &'static str,
) -> ColumnMigration {
    ColumnMigration {
        table,
        column,
        definition,
    }
}

pub const COLUMN_MIGRATIONS: &[ColumnMigration] = &[
    column("workspaces", "task_tool_id", "TEXT"),
    column("workspaces", "task_tool_external_id", "TEXT"),
    column("workspaces", "extra", "TEXT NOT NULL DEFAULT '{}'"),
    column("tools", "prompt", "TEXT NOT NULL DEFAULT ''"),
    column("tools", "local_path", "TEXT NOT NULL DEFAULT ''"),
    column("tools", "use_github_token", "INTEGER NOT NULL DEFAULT 0"),
    column("tools", "extra", "TEXT NOT NULL DEFAULT '{}'"),
    column("tasks", "notes", "TEXT NOT NULL DEFAULT ''"),
    column("tasks", "workspace_id", "TEXT"),
    column("tasks", "extra", "TEXT NOT NULL DEFAULT '{}'"),
    column("projects", "organization_id", "TEXT"),
    column("projects", "organization_name", "TEXT"),
    column("workspace_agents", "task_name", "TEXT"),
    column("workspace_agents", "task_description", "TEXT"),
    column("sync_log", "detail", "TEXT"),
];
