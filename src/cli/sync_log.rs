use anyhow::Result;

use super::{short_time, truncate};
use crate::store::SyncLogRepo;

pub fn list(repo: &SyncLogRepo, tool_id: Option<String>, limit: Option<usize>) -> Result<()> {
    let entries = match tool_id.as_deref() {
        Some(tool_id) => repo.recent_for_tool(tool_id, limit)?,
        None => repo.recent(limit)?,
    };
    if entries.is_empty() {
        println!("Sync log is empty.");
        return Ok(());
    }

    println!(
        "{:<17} {:<8} {:<14} {:<20} {}",
        "Time", "Level", "Tool", "Project", "Message"
    );
    println!("{}", "-".repeat(100));
    for e in entries {
        println!(
            "{:<17} {:<8} {:<14} {:<20} {}",
            short_time(&e.created_at),
            e.level.as_str(),
            truncate(&e.tool_id, 14),
            e.project_title
                .as_deref()
                .or(e.project_external_id.as_deref())
                .map(|p| truncate(p, 20))
                .unwrap_or_else(|| "-".to_string()),
            truncate(&e.message, 50)
        );
        if let Some(detail) = &e.detail {
            println!("{:>18}{}", "", truncate(detail, 80));
        }
    }
    Ok(())
}

pub fn purge(repo: &SyncLogRepo, tool_id: &str) -> Result<()> {
    let removed = repo.purge_by_tool(tool_id)?;
    println!("Removed {} sync log entries for {}", removed, tool_id);
    Ok(())
}
