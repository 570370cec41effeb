//! Cursor editor
//!
//! Same shape as VS Code; on Linux it usually ships as a versioned AppImage.

use super::LauncherSpec;

pub fn spec() -> LauncherSpec {
    LauncherSpec {
        id: "cursor".to_string(),
        display_name: "Cursor".to_string(),
        app_paths: app_paths(),
        commands: vec!["cursor".to_string()],
        mac_app_name: Some("Cursor".to_string()),
    }
}

#[cfg(target_os = "macos")]
fn app_paths() -> Vec<String> {
    vec![
        "/Applications/Cursor.app".to_string(),
        "~/Applications/Cursor.app".to_string(),
    ]
}

#[cfg(target_os = "windows")]
fn app_paths() -> Vec<String> {
    vec!["$LOCALAPPDATA/Programs/cursor/Cursor.exe".to_string()]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn app_paths() -> Vec<String> {
    vec![
        "/opt/Cursor/cursor".to_string(),
        "~/Applications/Cursor-*.AppImage".to_string(),
        "~/Applications/cursor-*.AppImage".to_string(),
    ]
}
