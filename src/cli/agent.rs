//! Workspace agent commands

use anyhow::Result;
use std::collections::BTreeMap;

use super::workspace;
use super::{resolve, short_id, truncate};
use crate::capacity::calculate_capacity;
use crate::store::{AgentRepo, NewAgent, TaskRepo, WorkspaceAgent, WorkspaceRepo};

pub fn add(
    repo: &AgentRepo,
    workspaces: &WorkspaceRepo,
    tasks: &TaskRepo,
    workspace_query: &str,
    name: String,
    summary: Option<String>,
    task_id: Option<String>,
) -> Result<()> {
    let workspace = workspace::find(workspaces, workspace_query)?;

    let mut new = NewAgent {
        workspace_id: workspace.id.clone(),
        name,
        summary: summary.unwrap_or_default(),
        ..Default::default()
    };
    if let Some(query) = task_id {
        let all = tasks.get_all()?;
        let task = resolve(&all, &query, "Task", |t| (t.id.as_str(), t.title.as_str()))?;
        new.task_id = Some(task.id.clone());
        new.task_name = Some(task.title.clone());
        new.task_description = Some(task.description.clone()).filter(|d| !d.is_empty());
    }

    let agent = repo.add(new)?;
    println!(
        "Agent '{}' added to '{}' with ID: {}",
        agent.name,
        workspace.name,
        short_id(&agent.id)
    );
    Ok(())
}

/// Agents grouped by workspace, with each workspace's load against
/// `capacity`.
pub fn list(
    repo: &AgentRepo,
    workspaces: &WorkspaceRepo,
    workspace_query: Option<String>,
    capacity: u32,
) -> Result<()> {
    let filtered = workspace_query.is_some();
    let workspaces = match workspace_query {
        Some(query) => vec![workspace::find(workspaces, &query)?],
        None => workspaces.get_all()?,
    };

    let mut by_workspace: BTreeMap<String, Vec<WorkspaceAgent>> = BTreeMap::new();
    for agent in repo.get_all()? {
        by_workspace
            .entry(agent.workspace_id.clone())
            .or_default()
            .push(agent);
    }

    if workspaces.is_empty() {
        println!("No workspaces found.");
        return Ok(());
    }

    for w in workspaces {
        let agents = by_workspace.remove(&w.id).unwrap_or_default();
        let load = calculate_capacity(capacity, agents.len() as u32);
        println!(
            "{} ({}/{} agents, {}% {}, {} free)",
            w.name,
            agents.len(),
            capacity,
            load.percentage,
            load.status,
            load.available
        );
        for a in agents {
            println!(
                "  {:<10} {:<20} {}",
                short_id(&a.id),
                truncate(&a.name, 20),
                a.task_name.as_deref().unwrap_or("-")
            );
        }
    }

    // Left over: agents whose workspace no longer exists.
    let orphans: usize = by_workspace.values().map(Vec::len).sum();
    if !filtered && orphans > 0 {
        println!("\n{} agents reference missing workspaces", orphans);
    }
    Ok(())
}

pub fn remove(repo: &AgentRepo, query: &str) -> Result<()> {
    let agents = repo.get_all()?;
    let agent = resolve(&agents, query, "Agent", |a| (a.id.as_str(), a.name.as_str()))?;
    repo.remove(&agent.id)?;
    println!("Agent '{}' removed", agent.name);
    Ok(())
}
