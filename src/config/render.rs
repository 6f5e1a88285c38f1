//! Render configuration options for the composed HTML document.

use crate::core::markup::{ComposeOptions, DEFAULT_FONT_FAMILY};

use serde::Deserialize;

/// The `[render]` table of pdv.toml.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Render {
    stylesheet: String,
    font_family: String,
    max_lines: usize,
    max_line_chars: usize,
    show_file_info: bool,
}

impl Render {
    #[inline]
    pub fn show_file_info(&self) -> bool {
        self.show_file_info
    }

    /// Composer options derived from this section. Zero bounds are treated as "unbounded".
    pub fn compose_options(&self) -> ComposeOptions {
        let stylesheet = self.stylesheet.trim();
        ComposeOptions {
            stylesheet: (!stylesheet.is_empty()).then(|| stylesheet.to_string()),
            font_family: if self.font_family.trim().is_empty() {
                DEFAULT_FONT_FAMILY.to_string()
            } else {
                self.font_family.clone()
            },
            max_lines: non_zero_or_max(self.max_lines),
            max_line_chars: non_zero_or_max(self.max_line_chars),
        }
    }
}

fn non_zero_or_max(value: usize) -> usize {
    if value == 0 { usize::MAX } else { value }
}

impl Default for Render {
    fn default() -> Self {
        let defaults = ComposeOptions::default();
        Render {
            stylesheet: String::new(),
            font_family: defaults.font_family,
            max_lines: defaults.max_lines,
            max_line_chars: defaults.max_line_chars,
            show_file_info: true,
        }
    }
}
