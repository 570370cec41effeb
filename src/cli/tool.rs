//! Tool catalog commands

use anyhow::{anyhow, Result};

use super::{resolve, short_id, truncate};
use crate::store::{NewTool, Tool, ToolRepo, ToolType, ToolUpdate};

fn find(repo: &ToolRepo, query: &str) -> Result<Tool> {
    let all = repo.get_all()?;
    resolve(&all, query, "Tool", |t| (t.id.as_str(), t.title.as_str())).cloned()
}

pub fn list(repo: &ToolRepo, enabled_only: bool) -> Result<()> {
    let tools = if enabled_only {
        repo.get_enabled()?
    } else {
        repo.get_all()?
    };
    if tools.is_empty() {
        println!("No tools found.");
        return Ok(());
    }

    println!(
        "{:<14} {:<18} {:<8} {:<8} {:<6} {}",
        "ID", "Title", "Type", "Enabled", "Token", "Description"
    );
    println!("{}", "-".repeat(90));
    for t in tools {
        println!(
            "{:<14} {:<18} {:<8} {:<8} {:<6} {}",
            truncate(&t.id, 14),
            truncate(&t.title, 18),
            t.tool_type.as_str(),
            if t.is_enabled { "yes" } else { "no" },
            if t.token.is_empty() { "-" } else { "set" },
            truncate(&t.description, 40)
        );
    }
    Ok(())
}

pub fn add(
    repo: &ToolRepo,
    title: String,
    tool_type: String,
    description: Option<String>,
    local_path: Option<String>,
) -> Result<()> {
    let tool_type: ToolType = tool_type.parse().map_err(|e: String| anyhow!(e))?;
    let mut new = NewTool::new(title, tool_type);
    new.description = description.unwrap_or_default();
    new.local_path = local_path.unwrap_or_default();

    let tool = repo.add(new)?;
    println!("Tool '{}' added with ID: {}", tool.title, short_id(&tool.id));
    Ok(())
}

/// Store a token for the tool; an empty token clears it.
pub fn set_token(repo: &ToolRepo, query: &str, token: String) -> Result<()> {
    let tool = find(repo, query)?;
    let clearing = token.is_empty();
    repo.update(
        &tool.id,
        ToolUpdate {
            token: Some(token),
            ..Default::default()
        },
    )?;
    if clearing {
        println!("Token cleared for '{}'", tool.title);
    } else {
        println!("Token stored for '{}'", tool.title);
    }
    Ok(())
}

pub fn set_enabled(repo: &ToolRepo, query: &str, enabled: bool) -> Result<()> {
    let tool = find(repo, query)?;
    repo.update(
        &tool.id,
        ToolUpdate {
            is_enabled: Some(enabled),
            ..Default::default()
        },
    )?;
    println!(
        "Tool '{}' {}",
        tool.title,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

pub fn remove(repo: &ToolRepo, query: &str) -> Result<()> {
    let tool = find(repo, query)?;
    repo.remove(&tool.id)?;
    println!("Tool '{}' removed", tool.title);
    Ok(())
}
