//! Editor commands

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

use super::workspace;
use crate::launcher::{AppLauncher, LauncherRegistry};
use crate::store::{ToolRepo, WorkspaceRepo};

pub fn find(registry: &LauncherRegistry, id: Option<String>) -> Result<()> {
    let specs: Vec<_> = match id {
        Some(id) => vec![registry
            .all()
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| anyhow!("Unknown or disabled editor: {}", id))?],
        None => registry.all().iter().collect(),
    };

    println!("{:<10} {:<22} {:<6} {}", "ID", "Editor", "Found", "Location");
    println!("{}", "-".repeat(85));
    for spec in specs {
        let found = AppLauncher::new(spec.clone()).find_installation();
        let location = match (found.cli.as_str(), found.path.as_str()) {
            ("", "") => "-".to_string(),
            (cli, "") => cli.to_string(),
            ("", path) => path.to_string(),
            (cli, path) => format!("{} ({})", cli, path),
        };
        println!(
            "{:<10} {:<22} {:<6} {}",
            spec.id,
            spec.display_name,
            if found.found { "yes" } else { "no" },
            location
        );
    }
    Ok(())
}

/// Open a workspace (by id or name) or a plain folder.
///
/// Without `--editor`, the workspace's editor tool decides, falling back to
/// VS Code.
pub fn open(
    registry: &LauncherRegistry,
    workspaces: &WorkspaceRepo,
    tools: &ToolRepo,
    target: &str,
    editor: Option<String>,
    cli: Option<String>,
) -> Result<()> {
    let as_path = PathBuf::from(shellexpand::tilde(target).to_string());
    let (folder, bound_editor) = if as_path.is_dir() {
        (as_path, None)
    } else {
        let w = workspace::find(workspaces, target)?;
        (PathBuf::from(&w.folder_path), w.editor_tool_id)
    };

    let editor_id = match (editor, bound_editor) {
        (Some(id), _) => id,
        (None, Some(tool_id)) => match tools.get_by_id(&tool_id)? {
            Some(tool) if tool.tool_type.is_editor() => tool.tool_type.as_str().to_string(),
            _ => "vscode".to_string(),
        },
        (None, None) => "vscode".to_string(),
    };

    let launcher = registry
        .get(&editor_id)
        .ok_or_else(|| anyhow!("Unknown or disabled editor: {}", editor_id))?;
    if !launcher.open(&folder, cli.as_deref()) {
        bail!(
            "Could not launch {} for {}",
            launcher.spec().display_name,
            folder.display()
        );
    }
    println!("Opened {} in {}", folder.display(), launcher.spec().display_name);
    Ok(())
}
