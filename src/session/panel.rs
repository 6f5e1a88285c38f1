//! The panel-hosting collaborator and the messages exchanged with rendered content.
//!
//! A [Panel] only accepts HTML strings and structured messages. Focus, disposal and view
//! messages are delivered by the host to the [SessionRegistry](crate::session::SessionRegistry),
//! which routes them to the owning session.

use serde::{Deserialize, Serialize};

use std::io;
use std::path::Path;

/// Host-side column a panel lives in. Forwarded untouched to the [TextOpener].
pub type ViewColumn = u32;

/// Directive sent from the core to the rendered content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    /// Signals the view to re-request the pipeline.
    Reload,
}

/// Message sent from the rendered content back to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ViewMessage {
    /// Open the same file with the host's plain text mechanism.
    ReopenAsText,
    /// Re-run the pipeline for the current file.
    Reload,
}

impl HostMessage {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

impl ViewMessage {
    /// Parse a view message from a JSON payload or one of the shorthands `text`/`reload`.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.starts_with('{') {
            return serde_json::from_str(input).ok();
        }
        match input.to_ascii_lowercase().as_str() {
            "text" | "reopen-as-text" => Some(ViewMessage::ReopenAsText),
            "reload" => Some(ViewMessage::Reload),
            _ => None,
        }
    }
}

/// Surface that displays a rendered document.
pub trait Panel: Send {
    fn set_content(&mut self, html: &str);

    fn post_message(&mut self, message: &HostMessage);

    /// Close the panel. The host reports the disposal back through the registry.
    fn dispose(&mut self);

    fn is_focused(&self) -> bool;

    fn view_column(&self) -> Option<ViewColumn> {
        None
    }
}

/// The host's generic "open this file as text" mechanism.
pub trait TextOpener {
    fn open_as_text(&mut self, path: &Path, column: Option<ViewColumn>) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shapes() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(HostMessage::Reload.to_json(), r#"{"type":"reload"}"#);
        assert_eq!(
            serde_json::to_string(&ViewMessage::ReopenAsText)?,
            r#"{"type":"reopen-as-text"}"#
        );
        let parsed: ViewMessage = serde_json::from_str(r#"{ "type": "reopen-as-text" }"#)?;
        assert_eq!(parsed, ViewMessage::ReopenAsText);
        Ok(())
    }

    #[test]
    fn test_parse_shorthands() {
        assert_eq!(ViewMessage::parse(" text\n"), Some(ViewMessage::ReopenAsText));
        assert_eq!(ViewMessage::parse("RELOAD"), Some(ViewMessage::Reload));
        assert_eq!(
            ViewMessage::parse(r#"{"type":"reload"}"#),
            Some(ViewMessage::Reload)
        );
        assert_eq!(ViewMessage::parse(r#"{"type":"scroll"}"#), None);
        assert_eq!(ViewMessage::parse("quit"), None);
    }
}
