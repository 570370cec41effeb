//! Visual Studio Code
//!
//! Installs as `Visual Studio Code.app` on macOS, under `/usr/share/code` or
//! a snap on Linux and as a per-user install on Windows. The `code` shell
//! command is optional on every platform.

use super::LauncherSpec;

pub fn spec() -> LauncherSpec {
    LauncherSpec {
        id: "vscode".to_string(),
        display_name: "Visual Studio Code".to_string(),
        app_paths: app_paths(),
        commands: vec!["code".to_string()],
        mac_app_name: Some("Visual Studio Code".to_string()),
    }
}

#[cfg(target_os = "macos")]
fn app_paths() -> Vec<String> {
    vec![
        "/Applications/Visual Studio Code.app".to_string(),
        "~/Applications/Visual Studio Code.app".to_string(),
    ]
}

#[cfg(target_os = "windows")]
fn app_paths() -> Vec<String> {
    vec![
        "$LOCALAPPDATA/Programs/Microsoft VS Code/Code.exe".to_string(),
        "$ProgramFiles/Microsoft VS Code/Code.exe".to_string(),
    ]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn app_paths() -> Vec<String> {
    vec![
        "/usr/share/code/code".to_string(),
        "/opt/visual-studio-code/code".to_string(),
        "/snap/code/current/usr/share/code/code".to_string(),
    ]
}
