//! Helpers for pydata-preview.
//!
//! Small path and process utilities:
//! - Resolving the home directory and expanding a leading "~"
//! - Displaying home directories as "~" in file paths
//! - Opening a file in the user's chosen editor
//!
//! These helpers are used by the config loader, the decoder gateway and the hosts.

use crate::config::Editor;

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The user's home directory, if the platform reports one.
pub fn get_home() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Expand a leading `~` or `~/` to the home directory. Other paths pass through.
pub fn expand_home_path(path: &str) -> PathBuf {
    if path == "~" {
        return get_home().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path
        .strip_prefix("~/")
        .or_else(|| path.strip_prefix("~\\"))
        && let Some(home) = get_home()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Opens a file in the configured editor ("nvim", "code" etc.) and waits for it to exit.
pub fn open_in_editor(editor: &Editor, file_path: &Path) -> io::Result<()> {
    let status = Command::new(editor.cmd()).arg(file_path).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "editor '{}' exited with {}",
            editor.cmd(),
            status
        )))
    }
}

/// Display `path` with the home directory written as `~`.
pub fn shorten_home_path(path: &Path) -> String {
    let under_home =
        get_home().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf));
    match under_home {
        Some(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Some(rest) => Path::new("~").join(rest).display().to_string(),
        None => readable_path(path),
    }
}

pub fn readable_path(path: &Path) -> String {
    #[cfg(windows)]
    {
        let display = path.display().to_string();
        display
            .strip_prefix(r"\\?\")
            .unwrap_or(&display)
            .to_string()
    }
    #[cfg(not(windows))]
    {
        path.display().to_string()
    }
}
