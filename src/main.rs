use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use devdesk::cli::{agent, calendar, editor, migrate, project, sync_log, task, tool, workspace};
use devdesk::config::Config;
use devdesk::launcher::LauncherRegistry;
use devdesk::logging;
use devdesk::secrets::SecretStore;
use devdesk::store::{
    AgentRepo, CalendarRepo, ProjectRepo, Store, SyncLogRepo, TaskRepo, ToolRepo, WorkspaceRepo,
};

#[derive(Parser)]
#[command(name = "devdesk")]
#[command(about = "Workspaces, tools and tasks for a local developer desk")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "devdesk.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Workspace management
    Workspace {
        #[command(subcommand)]
        command: WorkspaceCommands,
    },

    /// Tool catalog
    Tool {
        #[command(subcommand)]
        command: ToolCommands,
    },

    /// Tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Synced projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Workspace agents
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },

    /// Sync log
    SyncLog {
        #[command(subcommand)]
        command: SyncLogCommands,
    },

    /// Calendar events
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },

    /// Find and launch editors
    Editor {
        #[command(subcommand)]
        command: EditorCommands,
    },

    /// Apply pending schema changes and show what changed
    Migrate,
}

#[derive(Subcommand)]
enum WorkspaceCommands {
    /// Create a workspace
    Create {
        name: String,
        /// Project folder
        folder: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Editor tool id (e.g. tool-vscode)
        #[arg(long)]
        editor: Option<String>,
        /// Tool ids to bind (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,
    },
    /// List workspaces
    List,
    /// Show one workspace with its tasks and agents
    Show {
        /// Workspace ID prefix or name
        workspace: String,
        #[arg(long)]
        json: bool,
    },
    /// Update workspace fields
    Update {
        /// Workspace ID prefix or name
        workspace: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        folder: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Editor tool id; empty to clear
        #[arg(long)]
        editor: Option<String>,
    },
    /// Remove a workspace and its agents
    Remove {
        /// Workspace ID prefix or name
        workspace: String,
    },
}

#[derive(Subcommand)]
enum ToolCommands {
    /// List tools
    List {
        /// Only enabled tools
        #[arg(long)]
        enabled: bool,
    },
    /// Add a tool
    Add {
        title: String,
        /// vscode, cursor, github, jira, devops, mcp, rag or a custom type
        #[arg(long = "type")]
        tool_type: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        local_path: Option<String>,
    },
    /// Store an access token (encrypted); empty clears it
    SetToken {
        /// Tool ID or title
        tool: String,
        token: String,
    },
    /// Enable a tool
    Enable { tool: String },
    /// Disable a tool
    Disable { tool: String },
    /// Remove a tool
    Remove { tool: String },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Add a task
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Workspace ID prefix or name
        #[arg(short, long)]
        workspace: Option<String>,
        #[arg(long)]
        tool: Option<String>,
        #[arg(long)]
        external_id: Option<String>,
    },
    /// List tasks, most recently updated first
    List {
        #[arg(short, long)]
        workspace: Option<String>,
        /// pending, in_progress or done
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Change a task's status
    Status {
        /// Task ID prefix or title
        task: String,
        /// pending, in_progress or done
        status: String,
    },
    /// Remove a task
    Remove { task: String },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Add a project
    Add {
        name: String,
        /// ID in the source system
        external_id: String,
        /// GithubProject, GithubIssues, DevOps or Jira
        #[arg(long = "type")]
        project_type: String,
        #[arg(long)]
        tool: Option<String>,
        #[arg(long)]
        organization: Option<String>,
    },
    /// List projects
    List {
        #[arg(long)]
        tool: Option<String>,
    },
    /// Record a successful sync now
    Synced { project: String },
    /// Remove a project
    Remove { project: String },
}

#[derive(Subcommand)]
enum AgentCommands {
    /// Add an agent to a workspace
    Add {
        /// Workspace ID prefix or name
        workspace: String,
        name: String,
        #[arg(short, long)]
        summary: Option<String>,
        /// Task ID prefix or title
        #[arg(long)]
        task: Option<String>,
    },
    /// List agents and workspace capacity
    List {
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Remove an agent
    Remove { agent: String },
}

#[derive(Subcommand)]
enum SyncLogCommands {
    /// Show recent entries, newest first
    List {
        #[arg(long)]
        tool: Option<String>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Delete all entries for a tool
    Purge { tool: String },
}

#[derive(Subcommand)]
enum CalendarCommands {
    /// Add an event
    Add {
        title: String,
        /// RFC 3339, "YYYY-MM-DD HH:MM" or "YYYY-MM-DD"
        start: String,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        all_day: bool,
        #[arg(long)]
        location: Option<String>,
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// List events
    List {
        /// Only events starting at or after this time
        #[arg(long)]
        from: Option<String>,
        /// Window length in days when --from is given
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Remove an event
    Remove { event: String },
}

#[derive(Subcommand)]
enum EditorCommands {
    /// Show which editors are installed
    Find {
        /// Editor id (vscode, cursor, ...)
        editor: Option<String>,
    },
    /// Open a workspace or folder in an editor
    Open {
        /// Workspace ID prefix, name or folder path
        target: String,
        #[arg(short, long)]
        editor: Option<String>,
        /// Explicit editor command to run instead
        #[arg(long)]
        cli: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config)?;
    logging::init(&config.logging);
    debug!(config = %cli.config, "configuration loaded");

    if let Commands::Migrate = cli.command {
        return migrate::run(&config.database_path());
    }

    // Initialize store
    let store = Store::open(&config.database_path())?;

    match cli.command {
        Commands::Workspace { command } => {
            let repo = WorkspaceRepo::new(store.clone());
            match command {
                WorkspaceCommands::Create {
                    name,
                    folder,
                    description,
                    editor,
                    tools,
                } => workspace::create(&repo, name, folder, description, editor, tools)?,
                WorkspaceCommands::List => workspace::list(&repo)?,
                WorkspaceCommands::Show { workspace: query, json } => workspace::show(
                    &repo,
                    &TaskRepo::new(store.clone()),
                    &AgentRepo::new(store.clone()),
                    &query,
                    json,
                )?,
                WorkspaceCommands::Update {
                    workspace: query,
                    name,
                    folder,
                    description,
                    editor,
                } => workspace::update(&repo, &query, name, folder, description, editor)?,
                WorkspaceCommands::Remove { workspace: query } => {
                    workspace::remove(&repo, &AgentRepo::new(store.clone()), &query)?
                }
            }
        }
        Commands::Tool { command } => {
            let repo = open_tools(&config, &store)?;
            match command {
                ToolCommands::List { enabled } => tool::list(&repo, enabled)?,
                ToolCommands::Add {
                    title,
                    tool_type,
                    description,
                    local_path,
                } => tool::add(&repo, title, tool_type, description, local_path)?,
                ToolCommands::SetToken { tool: query, token } => {
                    tool::set_token(&repo, &query, token)?
                }
                ToolCommands::Enable { tool: query } => tool::set_enabled(&repo, &query, true)?,
                ToolCommands::Disable { tool: query } => tool::set_enabled(&repo, &query, false)?,
                ToolCommands::Remove { tool: query } => tool::remove(&repo, &query)?,
            }
        }
        Commands::Task { command } => {
            let repo = TaskRepo::new(store.clone());
            let workspaces = WorkspaceRepo::new(store.clone());
            match command {
                TaskCommands::Add {
                    title,
                    description,
                    workspace,
                    tool,
                    external_id,
                } => task::add(&repo, &workspaces, title, description, workspace, tool, external_id)?,
                TaskCommands::List { workspace, status } => {
                    task::list(&repo, &workspaces, workspace, status)?
                }
                TaskCommands::Status { task: query, status } => {
                    task::status(&repo, &query, status)?
                }
                TaskCommands::Remove { task: query } => task::remove(&repo, &query)?,
            }
        }
        Commands::Project { command } => {
            let repo = ProjectRepo::new(store.clone());
            match command {
                ProjectCommands::Add {
                    name,
                    external_id,
                    project_type,
                    tool,
                    organization,
                } => project::add(&repo, name, external_id, project_type, tool, organization)?,
                ProjectCommands::List { tool } => project::list(&repo, tool)?,
                ProjectCommands::Synced { project: query } => project::synced(&repo, &query)?,
                ProjectCommands::Remove { project: query } => project::remove(&repo, &query)?,
            }
        }
        Commands::Agent { command } => {
            let repo = AgentRepo::new(store.clone());
            let workspaces = WorkspaceRepo::new(store.clone());
            match command {
                AgentCommands::Add {
                    workspace,
                    name,
                    summary,
                    task,
                } => agent::add(
                    &repo,
                    &workspaces,
                    &TaskRepo::new(store.clone()),
                    &workspace,
                    name,
                    summary,
                    task,
                )?,
                AgentCommands::List { workspace } => agent::list(
                    &repo,
                    &workspaces,
                    workspace,
                    config.agents.capacity_per_workspace,
                )?,
                AgentCommands::Remove { agent: query } => agent::remove(&repo, &query)?,
            }
        }
        Commands::SyncLog { command } => {
            let repo = SyncLogRepo::new(store.clone());
            match command {
                SyncLogCommands::List { tool, limit } => sync_log::list(&repo, tool, limit)?,
                SyncLogCommands::Purge { tool } => sync_log::purge(&repo, &tool)?,
            }
        }
        Commands::Calendar { command } => {
            let repo = CalendarRepo::new(store.clone());
            match command {
                CalendarCommands::Add {
                    title,
                    start,
                    end,
                    all_day,
                    location,
                    workspace,
                } => calendar::add(
                    &repo,
                    &WorkspaceRepo::new(store.clone()),
                    title,
                    &start,
                    end,
                    all_day,
                    location,
                    workspace,
                )?,
                CalendarCommands::List { from, days } => calendar::list(&repo, from, days)?,
                CalendarCommands::Remove { event } => calendar::remove(&repo, &event)?,
            }
        }
        Commands::Editor { command } => {
            let registry = LauncherRegistry::from_config(&config);
            match command {
                EditorCommands::Find { editor: id } => editor::find(&registry, id)?,
                EditorCommands::Open {
                    target,
                    editor: id,
                    cli,
                } => editor::open(
                    &registry,
                    &WorkspaceRepo::new(store.clone()),
                    &open_tools(&config, &store)?,
                    &target,
                    id,
                    cli,
                )?,
            }
        }
        // Handled before the store is opened
        Commands::Migrate => {}
    }

    Ok(())
}

fn open_tools(config: &Config, store: &Store) -> Result<ToolRepo> {
    let key_path = config.key_path();
    let secrets = SecretStore::open(&key_path)
        .with_context(|| format!("opening secret key {}", key_path.display()))?;
    ToolRepo::new(store.clone(), secrets)
}
