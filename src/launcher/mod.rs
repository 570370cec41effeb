//! External editor launcher
//!
//! Every editor is described by a [`LauncherSpec`]: where its application
//! usually lives, which shell commands it installs and how to hand it a
//! folder. One [`AppLauncher`] drives any spec; the presets and config-defined
//! editors only differ in data.

mod cursor;
mod detect;
mod vscode;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Where to look for an editor and how to start it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSpec {
    pub id: String,
    pub display_name: String,
    /// Install locations, tried in order. `~`, `$VAR` and globs allowed.
    pub app_paths: Vec<String>,
    /// Shell command names, tried in order against the search path.
    pub commands: Vec<String>,
    /// Name passed to `open -a` on macOS.
    pub mac_app_name: Option<String>,
}

impl LauncherSpec {
    pub fn vscode() -> Self {
        vscode::spec()
    }

    pub fn cursor() -> Self {
        cursor::spec()
    }

    pub fn presets() -> Vec<Self> {
        vec![Self::vscode(), Self::cursor()]
    }
}

/// Result of probing for an editor. Empty strings mean "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Installation {
    pub found: bool,
    pub path: String,
    pub cli: String,
}

pub struct AppLauncher {
    spec: LauncherSpec,
    search_dirs: Vec<PathBuf>,
}

impl AppLauncher {
    /// Launcher that resolves commands against the process `PATH`.
    pub fn new(spec: LauncherSpec) -> Self {
        Self::with_search_dirs(spec, detect::path_dirs())
    }

    pub fn with_search_dirs(spec: LauncherSpec, search_dirs: Vec<PathBuf>) -> Self {
        Self { spec, search_dirs }
    }

    pub fn spec(&self) -> &LauncherSpec {
        &self.spec
    }

    fn app_path(&self) -> Option<PathBuf> {
        self.spec
            .app_paths
            .iter()
            .find_map(|pattern| detect::find_app_path(pattern))
    }

    fn cli_path(&self) -> Option<PathBuf> {
        self.spec
            .commands
            .iter()
            .find_map(|name| detect::find_executable_in_dirs(name, &self.search_dirs))
    }

    pub fn find_installation(&self) -> Installation {
        let path = self.app_path();
        let cli = self.cli_path();
        debug!(
            editor = %self.spec.id,
            path = ?path,
            cli = ?cli,
            "probed installation"
        );

        let path = path.map(|p| p.display().to_string()).unwrap_or_default();
        let cli = cli.map(|p| p.display().to_string()).unwrap_or_default();
        Installation {
            found: !path.is_empty() || !cli.is_empty(),
            path,
            cli,
        }
    }

    /// Open `folder` in the editor.
    ///
    /// Tries `cli_override`, then the editor's own shell command, then the
    /// application itself. Returns whether a process was started; the child
    /// is never waited on.
    pub fn open(&self, folder: &Path, cli_override: Option<&str>) -> bool {
        if let Some(cli) = cli_override.map(str::trim).filter(|c| !c.is_empty()) {
            return self.spawn(Command::new(cli).arg(folder));
        }

        if let Some(cli) = self.cli_path() {
            return self.spawn(Command::new(cli).arg(folder));
        }

        match self.app_path() {
            Some(app) => self.spawn(&mut self.app_command(&app, folder)),
            None => {
                warn!(editor = %self.spec.id, "no installation found");
                false
            }
        }
    }

    #[cfg(target_os = "macos")]
    fn app_command(&self, app: &Path, folder: &Path) -> Command {
        let mut cmd = Command::new("open");
        match &self.spec.mac_app_name {
            Some(name) => cmd.arg("-a").arg(name),
            None => cmd.arg("-a").arg(app),
        };
        cmd.arg(folder);
        cmd
    }

    #[cfg(not(target_os = "macos"))]
    fn app_command(&self, app: &Path, folder: &Path) -> Command {
        let mut cmd = Command::new(app);
        cmd.arg(folder);
        cmd
    }

    fn spawn(&self, cmd: &mut Command) -> bool {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        match cmd.spawn() {
            Ok(child) => {
                info!(editor = %self.spec.id, pid = child.id(), "editor launched");
                true
            }
            Err(e) => {
                warn!(
                    editor = %self.spec.id,
                    program = ?cmd.get_program(),
                    error = %e,
                    "failed to launch editor"
                );
                false
            }
        }
    }
}

/// The editors available on this installation: presets adjusted by config,
/// plus editors declared only in config. Disabled editors are left out.
pub struct LauncherRegistry {
    specs: Vec<LauncherSpec>,
}

impl LauncherRegistry {
    pub fn from_config(config: &Config) -> Self {
        let mut specs = LauncherSpec::presets();

        for spec in specs.iter_mut() {
            let Some(overrides) = config.editors.get(&spec.id) else {
                continue;
            };
            if let Some(name) = &overrides.display_name {
                spec.display_name = name.clone();
            }
            if !overrides.app_paths.is_empty() {
                spec.app_paths = overrides.app_paths.clone();
            }
            if !overrides.commands.is_empty() {
                spec.commands = overrides.commands.clone();
            }
            if overrides.mac_app_name.is_some() {
                spec.mac_app_name = overrides.mac_app_name.clone();
            }
        }

        let mut custom: Vec<LauncherSpec> = config
            .editors
            .iter()
            .filter(|(id, _)| !specs.iter().any(|s| &s.id == *id))
            .map(|(id, editor)| LauncherSpec {
                id: id.clone(),
                display_name: editor.display_name.clone().unwrap_or_else(|| id.clone()),
                app_paths: editor.app_paths.clone(),
                commands: editor.commands.clone(),
                mac_app_name: editor.mac_app_name.clone(),
            })
            .collect();
        custom.sort_by(|a, b| a.id.cmp(&b.id));
        specs.extend(custom);

        specs.retain(|s| config.is_editor_enabled(&s.id));
        Self { specs }
    }

    pub fn get(&self, id: &str) -> Option<AppLauncher> {
        self.specs
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .map(AppLauncher::new)
    }

    pub fn all(&self) -> &[LauncherSpec] {
        &self.specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use std::fs;

    fn write_stub(dir: &Path, name: &str) -> PathBuf {
        let stub = dir.join(name);
        fs::write(&stub, "#!/bin/sh\nexit 0\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).unwrap();
        }
        stub
    }

    fn spec(app_paths: Vec<String>, commands: Vec<String>) -> LauncherSpec {
        LauncherSpec {
            id: "test".into(),
            display_name: "Test Editor".into(),
            app_paths,
            commands,
            mac_app_name: None,
        }
    }

    #[test]
    fn nothing_installed() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = AppLauncher::with_search_dirs(
            spec(
                vec![dir.path().join("Missing.app").display().to_string()],
                vec!["missing-editor".into()],
            ),
            vec![dir.path().to_path_buf()],
        );
        assert_eq!(
            launcher.find_installation(),
            Installation {
                found: false,
                path: String::new(),
                cli: String::new()
            }
        );
    }

    #[test]
    fn finds_cli_on_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(dir.path(), "fake-editor");
        let launcher = AppLauncher::with_search_dirs(
            spec(vec![], vec!["not-there".into(), "fake-editor".into()]),
            vec![dir.path().to_path_buf()],
        );

        let found = launcher.find_installation();
        assert!(found.found);
        assert_eq!(found.cli, stub.display().to_string());
        assert!(found.path.is_empty());
    }

    #[test]
    fn finds_app_path() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("Editor.app");
        fs::create_dir(&app).unwrap();
        let launcher = AppLauncher::with_search_dirs(
            spec(vec![app.display().to_string()], vec![]),
            vec![],
        );

        let found = launcher.find_installation();
        assert!(found.found);
        assert_eq!(found.path, app.display().to_string());
        assert!(found.cli.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn open_with_resolved_cli() {
        let dir = tempfile::tempdir().unwrap();
        write_stub(dir.path(), "fake-editor");
        let launcher = AppLauncher::with_search_dirs(
            spec(vec![], vec!["fake-editor".into()]),
            vec![dir.path().to_path_buf()],
        );
        assert!(launcher.open(dir.path(), None));
    }

    #[cfg(unix)]
    #[test]
    fn open_with_explicit_cli() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(dir.path(), "custom-cli");
        let launcher = AppLauncher::with_search_dirs(spec(vec![], vec![]), vec![]);
        assert!(launcher.open(dir.path(), Some(stub.to_str().unwrap())));
    }

    #[test]
    fn open_without_installation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = AppLauncher::with_search_dirs(
            spec(vec![], vec!["missing-editor".into()]),
            vec![dir.path().to_path_buf()],
        );
        assert!(!launcher.open(dir.path(), None));
        assert!(!launcher.open(dir.path(), Some("/definitely/not/a/binary")));
    }

    #[test]
    fn presets_have_commands() {
        assert_eq!(LauncherSpec::vscode().commands, vec!["code".to_string()]);
        assert_eq!(LauncherSpec::cursor().commands, vec!["cursor".to_string()]);
        assert!(!LauncherSpec::vscode().app_paths.is_empty());
    }

    #[test]
    fn registry_applies_config() {
        let mut config = Config::default();
        config.editors.insert(
            "cursor".into(),
            EditorConfig {
                enabled: false,
                display_name: None,
                app_paths: vec![],
                commands: vec![],
                mac_app_name: None,
            },
        );
        config.editors.insert(
            "vscode".into(),
            EditorConfig {
                enabled: true,
                display_name: None,
                app_paths: vec![],
                commands: vec!["code-insiders".into()],
                mac_app_name: None,
            },
        );
        config.editors.insert(
            "zed".into(),
            EditorConfig {
                enabled: true,
                display_name: Some("Zed".into()),
                app_paths: vec![],
                commands: vec!["zed".into()],
                mac_app_name: None,
            },
        );

        let registry = LauncherRegistry::from_config(&config);
        let ids: Vec<&str> = registry.all().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["vscode", "zed"]);
        assert!(registry.get("cursor").is_none());

        let vscode = registry.get("vscode").unwrap();
        assert_eq!(vscode.spec().commands, vec!["code-insiders".to_string()]);
        assert_eq!(registry.get("zed").unwrap().spec().display_name, "Zed");
    }
}
