//! Append-only record of sync attempts per tool

use anyhow::Result;
use rusqlite::{params, Row, ToSql};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{new_id, now, parse_column, Store};

/// Default number of entries returned by `recent`.
pub const DEFAULT_LOG_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogEntry {
    pub id: String,
    pub tool_id: String,
    pub project_external_id: Option<String>,
    pub project_title: Option<String>,
    pub level: LogLevel,
    pub message: String,
    pub detail: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewSyncLogEntry {
    pub tool_id: String,
    pub project_external_id: Option<String>,
    pub project_title: Option<String>,
    pub level: LogLevel,
    pub message: String,
    pub detail: Option<String>,
}

impl NewSyncLogEntry {
    pub fn new(tool_id: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            project_external_id: None,
            project_title: None,
            level,
            message: message.into(),
            detail: None,
        }
    }
}

const COLUMNS: &str =
    "id, tool_id, project_external_id, project_title, level, message, detail, created_at";

fn map_row(row: &Row) -> rusqlite::Result<SyncLogEntry> {
    Ok(SyncLogEntry {
        id: row.get(0)?,
        tool_id: row.get(1)?,
        project_external_id: row.get(2)?,
        project_title: row.get(3)?,
        level: parse_column(row, 4)?,
        message: row.get(5)?,
        detail: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub struct SyncLogRepo {
    store: Store,
}

impl SyncLogRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self, entry), fields(tool_id = %entry.tool_id, level = %entry.level))]
    pub fn append(&self, entry: NewSyncLogEntry) -> Result<SyncLogEntry> {
        let entry = SyncLogEntry {
            id: new_id(),
            tool_id: entry.tool_id,
            project_external_id: entry.project_external_id,
            project_title: entry.project_title,
            level: entry.level,
            message: entry.message,
            detail: entry.detail,
            created_at: now(),
        };

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sync_log (id, tool_id, project_external_id, project_title, level,
                     message, detail, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    entry.id,
                    entry.tool_id,
                    entry.project_external_id,
                    entry.project_title,
                    entry.level.as_str(),
                    entry.message,
                    entry.detail,
                    entry.created_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(entry)
    }

    fn query(&self, filter: &str, args: &[&dyn ToSql]) -> Result<Vec<SyncLogEntry>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM sync_log {} ORDER BY created_at DESC, rowid DESC LIMIT ?",
                COLUMNS, filter
            ))?;
            let rows = stmt.query_map(args, map_row)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
        })
    }

    /// Newest entries first, at most `limit` (default [`DEFAULT_LOG_LIMIT`]).
    pub fn recent(&self, limit: Option<usize>) -> Result<Vec<SyncLogEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT) as i64;
        self.query("", params![limit])
    }

    pub fn recent_for_tool(&self, tool_id: &str, limit: Option<usize>) -> Result<Vec<SyncLogEntry>> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT) as i64;
        self.query("WHERE tool_id = ?", params![tool_id, limit])
    }

    /// Delete every entry of a tool. Returns how many were deleted.
    #[instrument(skip(self))]
    pub fn purge_by_tool(&self, tool_id: &str) -> Result<usize> {
        self.store.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM sync_log WHERE tool_id = ?", [tool_id])?;
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_is_newest_first_and_bounded() {
        let repo = SyncLogRepo::new(Store::open_in_memory().unwrap());
        for i in 0..5 {
            repo.append(NewSyncLogEntry::new("tool-github", LogLevel::Info, format!("run {i}")))
                .unwrap();
        }

        let recent = repo.recent(Some(3)).unwrap();
        let messages: Vec<&str> = recent.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["run 4", "run 3", "run 2"]);
        assert_eq!(repo.recent(None).unwrap().len(), 5);
    }

    #[test]
    fn default_limit_drops_the_oldest() {
        let repo = SyncLogRepo::new(Store::open_in_memory().unwrap());
        for i in 0..=DEFAULT_LOG_LIMIT {
            repo.append(NewSyncLogEntry::new("tool-github", LogLevel::Info, format!("run {i}")))
                .unwrap();
        }

        let recent = repo.recent(None).unwrap();
        assert_eq!(recent.len(), DEFAULT_LOG_LIMIT);
        assert_eq!(recent[0].message, format!("run {DEFAULT_LOG_LIMIT}"));
        assert_eq!(recent[DEFAULT_LOG_LIMIT - 1].message, "run 1");
        assert!(recent.iter().all(|e| e.message != "run 0"));

        let for_tool = repo.recent_for_tool("tool-github", None).unwrap();
        assert_eq!(for_tool.len(), DEFAULT_LOG_LIMIT);
    }

    #[test]
    fn purge_only_touches_one_tool() {
        let repo = SyncLogRepo::new(Store::open_in_memory().unwrap());
        repo.append(NewSyncLogEntry::new("tool-github", LogLevel::Error, "boom"))
            .unwrap();
        repo.append(NewSyncLogEntry::new("tool-github", LogLevel::Info, "ok"))
            .unwrap();
        let jira = repo
            .append(NewSyncLogEntry::new("tool-jira", LogLevel::Warning, "slow"))
            .unwrap();

        assert_eq!(repo.purge_by_tool("tool-github").unwrap(), 2);
        assert!(repo.recent_for_tool("tool-github", None).unwrap().is_empty());
        assert_eq!(repo.recent(None).unwrap(), vec![jira]);
    }

    #[test]
    fn detail_and_project_are_kept() {
        let repo = SyncLogRepo::new(Store::open_in_memory().unwrap());
        let mut entry = NewSyncLogEntry::new("tool-jira", LogLevel::Error, "sync failed");
        entry.project_external_id = Some("PRJ".into());
        entry.project_title = Some("Platform".into());
        entry.detail = Some("HTTP 401".into());
        let stored = repo.append(entry).unwrap();

        let loaded = repo.recent_for_tool("tool-jira", Some(1)).unwrap();
        assert_eq!(loaded, vec![stored]);
    }
}
