//! Formatting helpers for the document header.
//!
//! Collects the file attributes shown above the decoded content: display name, format kind,
//! human readable size and modification time. Missing metadata renders as "-".

use crate::core::format::FormatKind;

use chrono::{DateTime, Local};
use humansize::{BINARY, format_size};

use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// File attributes rendered in the document header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub kind: String,
    pub size: String,
    pub modified: String,
}

impl FileInfo {
    /// Gather header info for a file. Never fails; unreadable metadata shows as "-".
    pub fn gather(path: &Path, kind: FormatKind) -> Self {
        let meta = fs::metadata(path).ok();
        Self {
            name: display_name(path),
            kind: kind.label().to_string(),
            size: format_file_size(meta.as_ref().map(fs::Metadata::len)),
            modified: format_file_time(meta.and_then(|m| m.modified().ok())),
        }
    }
}

/// File name component, or the full path if there is none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Formats a file size in binary units, "-" if unknown.
pub fn format_file_size(size: Option<u64>) -> String {
    size.map(|sz| format_size(sz, BINARY))
        .unwrap_or_else(|| "-".to_string())
}

/// Formats the file modification time into a human-readable string.
/// # Returns
/// A string representing the formatted modification time or "-" if unknown.
pub fn format_file_time(modified: Option<SystemTime>) -> String {
    modified
        .map(|mtime| {
            let dt: DateTime<Local> = DateTime::from(mtime);
            dt.format("%Y-%m-%d %H:%M:%S").to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_gather_existing_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("weights.pt");
        fs::write(&path, vec![0u8; 2048])?;

        let info = FileInfo::gather(&path, FormatKind::ModelCheckpoint);
        assert_eq!(info.name, "weights.pt");
        assert_eq!(info.kind, "model-checkpoint");
        assert!(info.size.contains("KiB"), "unexpected size {}", info.size);
        assert_ne!(info.modified, "-");
        Ok(())
    }

    #[test]
    fn test_gather_missing_file() {
        let info = FileInfo::gather(Path::new("/definitely/not/here.npy"), FormatKind::NumericArray);
        assert_eq!(info.name, "here.npy");
        assert_eq!(info.size, "-");
        assert_eq!(info.modified, "-");
    }
}
