//! A panel that writes the rendered document to a file or stdout.
//!
//! Files are replaced atomically (write to a sibling temp file, then rename), so a browser
//! reloading the output never sees a half-written document.

use crate::session::{HostMessage, Panel, ViewColumn};

use tracing::{debug, warn};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelTarget {
    File(PathBuf),
    Stdout,
}

#[derive(Debug)]
pub struct FilePanel {
    target: PanelTarget,
    focused: bool,
    disposed: bool,
    writes: usize,
}

impl FilePanel {
    pub fn new(target: PanelTarget) -> Self {
        Self {
            target,
            focused: true,
            disposed: false,
            writes: 0,
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self::new(PanelTarget::File(path.into()))
    }

    pub fn stdout() -> Self {
        Self::new(PanelTarget::Stdout)
    }

    pub fn target(&self) -> &PanelTarget {
        &self.target
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn write(&self, html: &str) -> io::Result<()> {
        match &self.target {
            PanelTarget::File(path) => write_atomic(path, html),
            PanelTarget::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(html.as_bytes())?;
                out.write_all(b"\n")?;
                out.flush()
            }
        }
    }
}

fn write_atomic(path: &Path, content: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "preview.html".to_string());
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)
}

impl Panel for FilePanel {
    fn set_content(&mut self, html: &str) {
        if self.disposed {
            return;
        }
        match self.write(html) {
            Ok(()) => {
                self.writes += 1;
                debug!(target_kind = ?self.target, bytes = html.len(), "document written");
            }
            Err(e) => warn!(error = %e, "failed to write document"),
        }
    }

    fn post_message(&mut self, message: &HostMessage) {
        debug!(message = %message.to_json(), "posted to view");
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.focused = false;
    }

    fn is_focused(&self) -> bool {
        self.focused
    }

    fn view_column(&self) -> Option<ViewColumn> {
        Some(1)
    }
}
