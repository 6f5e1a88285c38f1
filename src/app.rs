//! Hosts for pydata-preview.
//!
//! - [watch]: the `notify` based file-watch collaborator.
//! - [panel]: [FilePanel], a panel writing documents to a file or stdout.
//! - [host]: [render_once] and the [WatchHost] event loop.

pub mod host;
pub mod panel;
pub mod watch;

pub use host::{EditorOpener, HostInput, WatchHost, render_once, spawn_stdin_reader};
pub use panel::{FilePanel, PanelTarget};
pub use watch::{FileWatcher, watch_file};
