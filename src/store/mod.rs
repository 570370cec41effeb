//! SQLite persistence
//!
//! One store file holds every table. `Store` wraps the connection behind a
//! mutex so repositories can share it; each repository owns its own table and
//! relations between tables are kept by convention, not by foreign keys.

mod agents;
mod calendar;
pub mod patch;
mod projects;
mod schema;
mod sync_log;
mod tasks;
mod tools;
mod workspaces;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use agents::{AgentRepo, AgentUpdate, NewAgent, WorkspaceAgent};
pub use calendar::{CalendarEvent, CalendarEventUpdate, CalendarRepo, NewCalendarEvent};
pub use projects::{NewProject, Project, ProjectRepo, ProjectType, ProjectUpdate};
pub use schema::{ColumnMigration, COLUMN_MIGRATIONS, INDEXES, SCHEMA, TABLES, TABLE_RENAMES};
pub use sync_log::{LogLevel, NewSyncLogEntry, SyncLogEntry, SyncLogRepo, DEFAULT_LOG_LIMIT};
pub use tasks::{NewTask, Task, TaskRepo, TaskStatus, TaskUpdate};
pub use tools::{NewTool, Tool, ToolRepo, ToolType, ToolUpdate, SEED_CATALOG};
pub use workspaces::{NewWorkspace, Workspace, WorkspaceRepo, WorkspaceUpdate};

/// Shared handle to the store connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

/// What `init_schema` changed on this run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// `(legacy, current)` table names
    pub renamed: Vec<(String, String)>,
    /// `(table, column)` pairs
    pub added_columns: Vec<(String, String)>,
    /// Steps that failed and were skipped, with the error text
    pub skipped: Vec<String>,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty() && self.added_columns.is_empty() && self.skipped.is_empty()
    }
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_report(path).map(|(store, _)| store)
    }

    /// Open the database and return what schema setup changed on the way.
    pub fn open_with_report(path: &Path) -> Result<(Self, MigrationReport)> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        let opened = Self::from_connection(conn, path.to_path_buf())?;
        info!(path = %path.display(), "database opened");
        Ok(opened)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, PathBuf::from(":memory:")).map(|(store, _)| store)
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Result<(Self, MigrationReport)> {
        conn.execute_batch(schema::PRAGMAS).context("applying pragmas")?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };
        let report = store.init_schema()?;
        if !report.is_empty() {
            info!(
                renamed = report.renamed.len(),
                added_columns = report.added_columns.len(),
                skipped = report.skipped.len(),
                "schema migrated"
            );
        }
        Ok((store, report))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a closure with the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Bring any prior schema shape up to date. Safe to run on every start.
    ///
    /// Renames, column additions and indexes are individually best-effort: a
    /// failing step is recorded in the report and the rest still run. Only a
    /// failure to create the tables themselves is an error.
    pub fn init_schema(&self) -> Result<MigrationReport> {
        self.with_conn(|conn| {
            let mut report = MigrationReport::default();

            for (legacy, current) in TABLE_RENAMES {
                if !table_exists(conn, legacy)? || table_exists(conn, current)? {
                    continue;
                }
                let sql = format!("ALTER TABLE {} RENAME TO {}", legacy, current);
                match conn.execute_batch(&sql) {
                    Ok(()) => {
                        info!(from = legacy, to = current, "renamed legacy table");
                        report
                            .renamed
                            .push((legacy.to_string(), current.to_string()));
                    }
                    Err(e) => {
                        warn!(from = legacy, to = current, error = %e, "table rename skipped");
                        report.skipped.push(format!("rename {}: {}", legacy, e));
                    }
                }
            }

            conn.execute_batch(SCHEMA).context("creating tables")?;

            for migration in COLUMN_MIGRATIONS {
                if column_names(conn, migration.table)?
                    .iter()
                    .any(|c| c == migration.column)
                {
                    continue;
                }
                let sql = format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    migration.table, migration.column, migration.definition
                );
                match conn.execute_batch(&sql) {
                    Ok(()) => {
                        debug!(table = migration.table, column = migration.column, "added column");
                        report
                            .added_columns
                            .push((migration.table.to_string(), migration.column.to_string()));
                    }
                    Err(e) => {
                        warn!(
                            table = migration.table,
                            column = migration.column,
                            error = %e,
                            "column migration skipped"
                        );
                        report.skipped.push(format!(
                            "add {}.{}: {}",
                            migration.table, migration.column, e
                        ));
                    }
                }
            }

            for (name, sql) in INDEXES {
                if let Err(e) = conn.execute_batch(sql) {
                    warn!(index = name, error = %e, "index creation skipped");
                    report.skipped.push(format!("index {}: {}", name, e));
                }
            }

            Ok(report)
        })
    }

    /// User tables, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(names)
        })
    }

    /// Columns of `table` in declaration order.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| column_names(conn, table))
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Current time in the format every timestamp column uses.
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Map a TEXT column through `FromStr`, surfacing bad values as conversion errors.
pub(crate) fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })
}

/// Read a JSON TEXT column, treating NULL or empty as the default value.
pub(crate) fn json_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    let raw: Option<String> = row.get(idx)?;
    match raw.as_deref() {
        None | Some("") => Ok(T::default()),
        Some(text) => serde_json::from_str(text).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_has_all_tables() {
        let store = Store::open_in_memory().unwrap();
        let tables = store.table_names().unwrap();
        for table in TABLES {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
    }

    #[test]
    fn init_schema_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let tables_before = store.table_names().unwrap();
        let columns_before: Vec<Vec<String>> = TABLES
            .iter()
            .map(|t| store.column_names(t).unwrap())
            .collect();

        let report = store.init_schema().unwrap();
        assert!(report.is_empty(), "second run changed schema: {report:?}");

        assert_eq!(store.table_names().unwrap(), tables_before);
        let columns_after: Vec<Vec<String>> = TABLES
            .iter()
            .map(|t| store.column_names(t).unwrap())
            .collect();
        assert_eq!(columns_after, columns_before);
    }

    #[test]
    fn legacy_shape_is_migrated_without_data_loss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE integrations (
                     id TEXT PRIMARY KEY, title TEXT NOT NULL, description TEXT NOT NULL DEFAULT '',
                     is_enabled INTEGER NOT NULL DEFAULT 1, tool_type TEXT NOT NULL,
                     token TEXT NOT NULL DEFAULT ''
                 );
                 INSERT INTO integrations (id, title, tool_type) VALUES ('t1', 'Legacy GitHub', 'github');
                 CREATE TABLE tasks (
                     id TEXT PRIMARY KEY, title TEXT NOT NULL, description TEXT NOT NULL DEFAULT '',
                     external_id TEXT, tool_id TEXT, status TEXT NOT NULL DEFAULT 'pending',
                     last_updated_at TEXT NOT NULL
                 );
                 INSERT INTO tasks (id, title, last_updated_at) VALUES ('k1', 'Old task', '2024-01-01T00:00:00Z');",
            )
            .unwrap();
        }

        let (store, report) = Store::open_with_report(&path).unwrap();
        assert_eq!(
            report.renamed,
            vec![("integrations".to_string(), "tools".to_string())]
        );
        assert!(report
            .added_columns
            .contains(&("tasks".to_string(), "workspace_id".to_string())));
        let tables = store.table_names().unwrap();
        assert!(!tables.contains(&"integrations".to_string()));
        assert!(tables.contains(&"tools".to_string()));

        let tool_columns = store.column_names("tools").unwrap();
        for column in ["prompt", "local_path", "use_github_token", "extra"] {
            assert!(tool_columns.iter().any(|c| c == column), "tools.{column}");
        }
        let task_columns = store.column_names("tasks").unwrap();
        assert!(task_columns.iter().any(|c| c == "workspace_id"));

        let title: String = store
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT title FROM tools WHERE id = 't1'", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(title, "Legacy GitHub");
        let task: String = store
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT title FROM tasks WHERE id = 'k1'", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(task, "Old task");

        // Reopening finds nothing left to do.
        drop(store);
        let reopened = Store::open(&path).unwrap();
        assert!(reopened.init_schema().unwrap().is_empty());
    }

    #[test]
    fn failing_steps_are_skipped_and_open_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.db");
        {
            // A view cannot take new columns or indexes.
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE VIEW sync_log AS
                 SELECT 'e1' AS id, 'tool-github' AS tool_id, 'ok' AS message,
                        '2024-01-01T00:00:00Z' AS created_at",
            )
            .unwrap();
        }

        let (store, report) = Store::open_with_report(&path).unwrap();
        assert!(report.skipped.iter().any(|s| s.starts_with("add sync_log.detail")));
        assert!(report.skipped.iter().any(|s| s.starts_with("index idx_sync_log_tool")));
        assert!(report.skipped.iter().any(|s| s.starts_with("index idx_sync_log_created")));

        // Steps after the failures still ran.
        let calendar_index: i64 = store
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE type = 'index' AND name = 'idx_calendar_start'",
                    [],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(calendar_index, 1);
        assert!(store.table_names().unwrap().contains(&"tasks".to_string()));
    }

    #[test]
    fn rename_is_skipped_when_current_table_exists() {
        let store = Store::open_in_memory().unwrap();
        store
            .with_conn(|conn| {
                conn.execute_batch("CREATE TABLE agents (id TEXT PRIMARY KEY)")?;
                Ok(())
            })
            .unwrap();
        let report = store.init_schema().unwrap();
        assert!(report.renamed.is_empty());
        assert!(store.table_names().unwrap().contains(&"agents".to_string()));
    }
}
