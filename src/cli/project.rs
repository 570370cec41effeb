use anyhow::{anyhow, Result};

use super::{resolve, short_id, truncate};
use crate::store::{NewProject, Project, ProjectRepo, ProjectType};

fn find(repo: &ProjectRepo, query: &str) -> Result<Project> {
    let projects = repo.get_all()?;
    resolve(&projects, query, "Project", |p| (p.id.as_str(), p.name.as_str())).cloned()
}

pub fn add(
    repo: &ProjectRepo,
    name: String,
    external_id: String,
    project_type: String,
    tool_id: Option<String>,
    organization: Option<String>,
) -> Result<()> {
    let project_type: ProjectType = project_type.parse().map_err(|e: String| anyhow!(e))?;
    let project = repo.add(NewProject {
        name,
        external_id,
        tool_id,
        project_type,
        organization_id: organization.clone(),
        organization_name: organization,
    })?;
    println!("Project '{}' added with ID: {}", project.name, short_id(&project.id));
    Ok(())
}

pub fn list(repo: &ProjectRepo, tool_id: Option<String>) -> Result<()> {
    let projects = match tool_id {
        Some(tool_id) => repo.get_by_tool(&tool_id)?,
        None => repo.get_all()?,
    };
    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!(
        "{:<10} {:<22} {:<14} {:<14} {:<20} {}",
        "ID", "Name", "Type", "Tool", "Last sync", "External ID"
    );
    println!("{}", "-".repeat(100));
    for p in projects {
        println!(
            "{:<10} {:<22} {:<14} {:<14} {:<20} {}",
            short_id(&p.id),
            truncate(&p.name, 22),
            p.project_type.as_str(),
            p.tool_id.as_deref().unwrap_or("-"),
            p.last_sync.as_deref().map(|s| truncate(s, 19)).unwrap_or_else(|| "never".to_string()),
            p.external_id
        );
    }
    Ok(())
}

pub fn synced(repo: &ProjectRepo, query: &str) -> Result<()> {
    let project = find(repo, query)?;
    repo.mark_synced(&project.id)?;
    println!("Project '{}' marked as synced", project.name);
    Ok(())
}

pub fn remove(repo: &ProjectRepo, query: &str) -> Result<()> {
    let project = find(repo, query)?;
    repo.remove(&project.id)?;
    println!("Project '{}' removed", project.name);
    Ok(())
}
