//! Command and application lookup on the local filesystem

use std::path::{Path, PathBuf};

#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && (m.permissions().mode() & 0o111 != 0))
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(windows)]
const EXTENSIONS: &[&str] = &["", ".exe", ".cmd", ".bat"];
#[cfg(not(windows))]
const EXTENSIONS: &[&str] = &[""];

/// Directories listed in `PATH`, in order.
pub(crate) fn path_dirs() -> Vec<PathBuf> {
    std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default()
}

/// First executable called `name` in `dirs`.
pub(crate) fn find_executable_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(name);
        return is_executable(&path).then_some(path);
    }

    for dir in dirs {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for ext in EXTENSIONS {
            let candidate = dir.join(format!("{name}{ext}"));
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Resolve an application location pattern to an existing path.
///
/// Patterns may start with `~`, reference environment variables (`$HOME`)
/// and contain glob wildcards. A pattern whose variables are unset matches
/// nothing.
pub(crate) fn find_app_path(pattern: &str) -> Option<PathBuf> {
    let expanded = shellexpand::full(pattern).ok()?.into_owned();

    if expanded.contains(['*', '?', '[']) {
        let mut matches: Vec<PathBuf> = glob::glob(&expanded)
            .ok()?
            .filter_map(Result::ok)
            .filter(|p| p.exists())
            .collect();
        // Newest-looking version last in lexical order; prefer it.
        matches.sort();
        return matches.pop();
    }

    let path = PathBuf::from(expanded);
    path.exists().then_some(path)
}
