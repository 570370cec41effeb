//! Task commands

use anyhow::{anyhow, Result};

use super::workspace;
use super::{resolve, short_id, short_time, truncate};
use crate::store::{NewTask, Task, TaskRepo, TaskStatus, WorkspaceRepo};

fn find(repo: &TaskRepo, query: &str) -> Result<Task> {
    let all = repo.get_all()?;
    resolve(&all, query, "Task", |t| (t.id.as_str(), t.title.as_str())).cloned()
}

pub fn add(
    repo: &TaskRepo,
    workspaces: &WorkspaceRepo,
    title: String,
    description: Option<String>,
    workspace_query: Option<String>,
    tool_id: Option<String>,
    external_id: Option<String>,
) -> Result<()> {
    let mut new = NewTask::new(title);
    new.description = description.unwrap_or_default();
    new.tool_id = tool_id;
    new.external_id = external_id;
    if let Some(query) = workspace_query {
        new.workspace_id = Some(workspace::find(workspaces, &query)?.id);
    }

    let task = repo.add(new)?;
    println!("Task '{}' added with ID: {}", task.title, short_id(&task.id));
    Ok(())
}

pub fn list(
    repo: &TaskRepo,
    workspaces: &WorkspaceRepo,
    workspace_query: Option<String>,
    status: Option<String>,
) -> Result<()> {
    let mut tasks = match workspace_query {
        Some(query) => repo.get_by_workspace(&workspace::find(workspaces, &query)?.id)?,
        None => repo.get_all()?,
    };
    if let Some(status) = status {
        let status: TaskStatus = status.parse().map_err(|e: String| anyhow!(e))?;
        tasks.retain(|t| t.status == status);
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!(
        "{:<10} {:<12} {:<17} {:<10} {}",
        "ID", "Status", "Updated", "Workspace", "Title"
    );
    println!("{}", "-".repeat(90));
    for t in tasks {
        println!(
            "{:<10} {:<12} {:<17} {:<10} {}",
            short_id(&t.id),
            t.status.as_str(),
            short_time(&t.last_updated_at),
            t.workspace_id.as_deref().map(short_id).unwrap_or("-"),
            truncate(&t.title, 45)
        );
    }
    Ok(())
}

pub fn status(repo: &TaskRepo, query: &str, status: String) -> Result<()> {
    let status: TaskStatus = status.parse().map_err(|e: String| anyhow!(e))?;
    let task = find(repo, query)?;
    repo.set_status(&task.id, status)?;
    println!("Task '{}' is now {}", task.title, status);
    Ok(())
}

pub fn remove(repo: &TaskRepo, query: &str) -> Result<()> {
    let task = find(repo, query)?;
    repo.remove(&task.id)?;
    println!("Task '{}' removed", task.title);
    Ok(())
}
