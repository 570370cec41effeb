//! Workspace commands

use anyhow::{Context, Result};
use std::path::Path;

use super::{resolve, short_id, truncate};
use crate::store::{AgentRepo, NewWorkspace, TaskRepo, Workspace, WorkspaceRepo, WorkspaceUpdate};

pub(crate) fn find(repo: &WorkspaceRepo, query: &str) -> Result<Workspace> {
    let all = repo.get_all()?;
    resolve(&all, query, "Workspace", |w| (w.id.as_str(), w.name.as_str())).cloned()
}

fn absolute(folder: &str) -> Result<String> {
    let expanded = shellexpand::tilde(folder).to_string();
    let path = Path::new(&expanded);
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("resolving current directory")?
            .join(path)
    };
    Ok(path.display().to_string())
}

pub fn create(
    repo: &WorkspaceRepo,
    name: String,
    folder: String,
    description: Option<String>,
    editor: Option<String>,
    tools: Vec<String>,
) -> Result<()> {
    let workspace = repo.add(NewWorkspace {
        name,
        folder_path: absolute(&folder)?,
        description: description.unwrap_or_default(),
        editor_tool_id: editor,
        tools,
        ..Default::default()
    })?;
    println!(
        "Workspace '{}' created with ID: {}",
        workspace.name, workspace.id
    );
    Ok(())
}

pub fn list(repo: &WorkspaceRepo) -> Result<()> {
    let workspaces = repo.get_all()?;
    if workspaces.is_empty() {
        println!("No workspaces found. Create one with 'devdesk workspace create'.");
        return Ok(());
    }

    println!("{:<10} {:<20} {:<14} {}", "ID", "Name", "Editor", "Folder");
    println!("{}", "-".repeat(85));
    for w in workspaces {
        println!(
            "{:<10} {:<20} {:<14} {}",
            short_id(&w.id),
            truncate(&w.name, 20),
            w.editor_tool_id.as_deref().unwrap_or("-"),
            w.folder_path
        );
    }
    Ok(())
}

pub fn show(
    repo: &WorkspaceRepo,
    tasks: &TaskRepo,
    agents: &AgentRepo,
    query: &str,
    json: bool,
) -> Result<()> {
    let workspace = find(repo, query)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&workspace)?);
        return Ok(());
    }

    println!("Workspace: {}", workspace.name);
    println!("ID:        {}", workspace.id);
    println!("Folder:    {}", workspace.folder_path);
    if !workspace.description.is_empty() {
        println!("About:     {}", workspace.description);
    }
    println!(
        "Editor:    {}",
        workspace.editor_tool_id.as_deref().unwrap_or("-")
    );
    if let Some(task_tool) = &workspace.task_tool_id {
        println!(
            "Tasks via: {} {}",
            task_tool,
            workspace.task_tool_external_id.as_deref().unwrap_or("")
        );
    }
    if !workspace.tools.is_empty() {
        println!("Tools:     {}", workspace.tools.join(", "));
    }
    println!("Created:   {}", workspace.created_at);

    let tasks = tasks.get_by_workspace(&workspace.id)?;
    println!("\nTasks ({})", tasks.len());
    for t in tasks {
        println!("  [{:<11}] {} {}", t.status.as_str(), short_id(&t.id), t.title);
    }

    let agents = agents.get_by_workspace(&workspace.id)?;
    println!("\nAgents ({})", agents.len());
    for a in agents {
        println!(
            "  {} {} {}",
            short_id(&a.id),
            a.name,
            a.task_name.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub fn update(
    repo: &WorkspaceRepo,
    query: &str,
    name: Option<String>,
    folder: Option<String>,
    description: Option<String>,
    editor: Option<String>,
) -> Result<()> {
    let workspace = find(repo, query)?;
    let folder_path = folder.map(|f| absolute(&f)).transpose()?;
    let changed = repo.update(
        &workspace.id,
        WorkspaceUpdate {
            name,
            folder_path,
            description,
            // An empty value clears the editor binding.
            editor_tool_id: editor.map(|e| Some(e).filter(|e| !e.is_empty())),
            ..Default::default()
        },
    )?;

    if changed {
        println!("Workspace '{}' updated", workspace.name);
    } else {
        println!("Nothing to update");
    }
    Ok(())
}

/// Remove the workspace and the agents bound to it. Tasks keep their
/// `workspace_id`.
pub fn remove(repo: &WorkspaceRepo, agents: &AgentRepo, query: &str) -> Result<()> {
    let workspace = find(repo, query)?;
    let removed_agents = agents.remove_by_workspace(&workspace.id)?;
    repo.remove(&workspace.id)?;
    println!(
        "Workspace '{}' removed ({} agents)",
        workspace.name, removed_agents
    );
    Ok(())
}
