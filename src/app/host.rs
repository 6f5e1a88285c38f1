//! In-crate hosts driving preview sessions from real events.
//!
//! [render_once] runs the pipeline a single time on the calling thread. [WatchHost] keeps
//! sessions alive: decodes go to [Workers], file events come from [watch_file], view
//! messages from stdin, and everything is funneled through one [SessionRegistry] on the
//! host thread.

use crate::app::watch::watch_file;
use crate::config::Editor;
use crate::core::worker::{DecodeTicket, Workers};
use crate::session::{
    FileEvent, Panel, PreviewSession, SessionId, SessionOptions, SessionRegistry, Subscription,
    TextOpener, ViewColumn, ViewMessage,
};
use crate::utils::open_in_editor;

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use tracing::{debug, info, warn};

use std::io::{self, BufRead};
use std::path::Path;
use std::{fs, thread};

/// Input delivered to the host from the view side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostInput {
    Message(ViewMessage),
    Quit,
}

impl HostInput {
    /// Parse one line of stdin: a view message, or `quit`/`q`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => None,
            "quit" | "q" | "exit" => Some(HostInput::Quit),
            other => ViewMessage::parse(other).map(HostInput::Message),
        }
    }
}

/// Opens files as plain text with the configured editor.
#[derive(Debug, Clone)]
pub struct EditorOpener {
    editor: Editor,
}

impl EditorOpener {
    pub fn new(editor: Editor) -> Self {
        Self { editor }
    }
}

impl TextOpener for EditorOpener {
    fn open_as_text(&mut self, path: &Path, column: Option<ViewColumn>) -> io::Result<()> {
        debug!(path = %path.display(), ?column, editor = self.editor.cmd(), "reopen as text");
        if !self.editor.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("editor '{}' is not on PATH", self.editor.cmd()),
            ));
        }
        open_in_editor(&self.editor, path)
    }
}

/// Run the whole pipeline once for `file` and hand the document to `panel`.
/// Returns the finished session. A decode failure still produces a document.
pub fn render_once(file: &Path, panel: Box<dyn Panel>, options: SessionOptions) -> PreviewSession {
    let (mut session, ticket) = PreviewSession::open(file, panel, options);
    let response = ticket.run();
    session.apply(response.seq, response.result);
    session
}

pub struct WatchHost {
    registry: SessionRegistry,
    workers: Workers,
    event_tx: Sender<(SessionId, FileEvent)>,
    event_rx: Receiver<(SessionId, FileEvent)>,
    opener: Box<dyn TextOpener>,
    options: SessionOptions,
}

impl WatchHost {
    pub fn new(options: SessionOptions, workers: usize, opener: Box<dyn TextOpener>) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            registry: SessionRegistry::new(),
            workers: Workers::spawn(workers),
            event_tx,
            event_rx,
            opener,
            options,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Sender feeding file events into the loop, e.g. for a host with its own watcher.
    pub fn event_sender(&self) -> Sender<(SessionId, FileEvent)> {
        self.event_tx.clone()
    }

    /// Open a session for `file`, start watching it and queue the initial decode.
    pub fn open(&mut self, file: &Path, panel: Box<dyn Panel>) -> io::Result<SessionId> {
        let path = fs::canonicalize(file)?;
        let (mut session, ticket) = PreviewSession::open(&path, panel, self.options.clone());
        let watcher = watch_file(session.id(), &path, self.event_tx.clone())?;
        session.add_subscription(Subscription::holding("file watcher", watcher));

        let id = self.registry.register(session).map_err(io::Error::other)?;
        info!(session = %id, path = %path.display(), "watching");
        self.submit(Some(ticket));
        Ok(id)
    }

    /// Process events until every session is gone or `input` asks to quit.
    pub fn run(&mut self, input: Receiver<HostInput>) {
        let responses = self.workers.response_rx().clone();
        let events = self.event_rx.clone();

        while !self.registry.is_empty() {
            select! {
                recv(responses) -> msg => match msg {
                    Ok(response) => {
                        self.registry.complete(response);
                    }
                    Err(_) => {
                        warn!("decode workers stopped");
                        break;
                    }
                },
                recv(events) -> msg => {
                    if let Ok((id, event)) = msg {
                        self.on_file_event(id, &event);
                    }
                },
                recv(input) -> msg => match msg {
                    Ok(HostInput::Message(message)) => self.on_view_message(message),
                    Ok(HostInput::Quit) | Err(_) => {
                        debug!("input closed, shutting down");
                        self.registry.dispose_all();
                    }
                },
            }
        }
    }

    fn on_file_event(&mut self, id: SessionId, event: &FileEvent) {
        match self.registry.file_event(id, event) {
            Ok(ticket) => self.submit(ticket),
            // Already unregistered; late events are expected.
            Err(e) => debug!(error = %e, "file event dropped"),
        }
    }

    /// View messages go to the focused session, or the oldest one if none has focus.
    fn on_view_message(&mut self, message: ViewMessage) {
        let Some(id) = self
            .registry
            .focus()
            .or_else(|| self.registry.ids().first().copied())
        else {
            return;
        };
        match self.registry.message(id, message, self.opener.as_mut()) {
            Ok(ticket) => self.submit(ticket),
            Err(e) => debug!(error = %e, "view message dropped"),
        }
    }

    fn submit(&self, ticket: Option<DecodeTicket>) {
        if let Some(ticket) = ticket
            && !self.workers.submit(ticket)
        {
            warn!("decode queue closed");
        }
    }
}

/// Read stdin lines on a background thread. EOF becomes [HostInput::Quit].
pub fn spawn_stdin_reader() -> Receiver<HostInput> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match HostInput::parse(&line) {
                Some(input) => {
                    if tx.send(input).is_err() {
                        return;
                    }
                }
                None if !line.trim().is_empty() => warn!(input = %line.trim(), "unknown view message"),
                None => {}
            }
        }
        let _ = tx.send(HostInput::Quit);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_input_parse() {
        assert_eq!(HostInput::parse("quit"), Some(HostInput::Quit));
        assert_eq!(
            HostInput::parse(r#"{"type":"reopen-as-text"}"#),
            Some(HostInput::Message(ViewMessage::ReopenAsText))
        );
        assert_eq!(
            HostInput::parse("reload"),
            Some(HostInput::Message(ViewMessage::Reload))
        );
        assert_eq!(HostInput::parse("   "), None);
        assert_eq!(HostInput::parse("scroll"), None);
    }
}
