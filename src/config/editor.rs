//! Editor configuration options, used to reopen a previewed file as plain text.

use serde::Deserialize;

/// Editor configuration options
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Editor {
    cmd: String,
}

/// Public methods for accessing editor configuration options
impl Editor {
    pub fn new(cmd: impl Into<String>) -> Self {
        Editor { cmd: cmd.into() }
    }

    #[inline]
    pub fn cmd(&self) -> &str {
        let trimmed = self.cmd.trim();
        if trimmed.is_empty() { "vim" } else { trimmed }
    }

    pub fn exists(&self) -> bool {
        which::which(self.cmd()).is_ok()
    }
}

/// Default editor configuration options
impl Default for Editor {
    fn default() -> Self {
        Editor { cmd: "nvim".into() }
    }
}
