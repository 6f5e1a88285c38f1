//! The Preview Session state machine.
//!
//! A session owns one watched file, its panel and the document currently shown in it.
//! States move `Visible` <-> `Active` with panel focus and end in `Disposed`, after which
//! no event changes anything and no decode result is applied.
//!
//! Decodes are issued as [DecodeTicket]s carrying a per-session sequence number. Only the
//! result for the newest ticket is applied, so an older decode finishing late never
//! overwrites a newer one.

use crate::core::format::{FormatKind, classify_with};
use crate::core::formatter::FileInfo;
use crate::core::markup::{ComposeOptions, RenderedDocument, compose_error, compose_with};
use crate::core::proc::{DecodeResult, DecoderSettings};
use crate::core::worker::DecodeTicket;
use crate::session::panel::{HostMessage, Panel, TextOpener, ViewMessage};
use crate::session::subscription::{Subscription, Teardown};

use tracing::{debug, trace, warn};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Visible,
    Active,
    Disposed,
}

/// Events from the file-watch collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Changed(PathBuf),
    Deleted(PathBuf),
}

/// Pipeline knobs shared by all sessions of a host.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub decoder: DecoderSettings,
    pub compose: ComposeOptions,
    pub show_file_info: bool,
}

pub struct PreviewSession {
    id: SessionId,
    path: PathBuf,
    path_str: String,
    kind: FormatKind,
    panel: Box<dyn Panel>,
    state: PreviewState,
    document: Option<RenderedDocument>,
    latest_seq: u64,
    options: SessionOptions,
    teardown: Teardown,
}

impl fmt::Debug for PreviewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewSession")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("latest_seq", &self.latest_seq)
            .finish_non_exhaustive()
    }
}

impl PreviewSession {
    /// Create a `Visible` session and the ticket for its initial decode.
    pub fn open(
        path: impl Into<PathBuf>,
        panel: Box<dyn Panel>,
        options: SessionOptions,
    ) -> (Self, DecodeTicket) {
        let path = path.into();
        let path_str = path.to_string_lossy().into_owned();
        let kind = classify_with(&path_str, options.decoder.path_style);
        let mut session = Self {
            id: SessionId::next(),
            path,
            path_str,
            kind,
            panel,
            state: PreviewState::Visible,
            document: None,
            latest_seq: 0,
            options,
            teardown: Teardown::default(),
        };
        debug!(session = %session.id, path = %session.path_str, kind = %kind, "session opened");
        let ticket = session.next_ticket();
        (session, ticket)
    }

    // Getters / accessors

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.state == PreviewState::Disposed
    }

    pub fn document(&self) -> Option<&RenderedDocument> {
        self.document.as_ref()
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Tie a subscription to this session's lifetime.
    pub fn add_subscription(&mut self, sub: Subscription) {
        self.teardown.push(sub);
    }

    /// Issue a new decode, superseding any in flight. `None` once disposed.
    pub fn reload(&mut self) -> Option<DecodeTicket> {
        if self.is_disposed() {
            return None;
        }
        Some(self.next_ticket())
    }

    fn next_ticket(&mut self) -> DecodeTicket {
        self.latest_seq += 1;
        DecodeTicket {
            session: self.id,
            seq: self.latest_seq,
            kind: self.kind,
            path: self.path_str.clone(),
            settings: self.options.decoder.clone(),
        }
    }

    /// Re-read focus from the panel. Returns true if the state changed.
    pub fn on_view_state_changed(&mut self) -> bool {
        if self.is_disposed() {
            return false;
        }
        let next = if self.panel.is_focused() {
            PreviewState::Active
        } else {
            PreviewState::Visible
        };
        self.transition(next)
    }

    /// Promote to `Active` without asking the panel.
    pub(crate) fn activate(&mut self) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.transition(PreviewState::Active)
    }

    /// Demote to `Visible` without asking the panel.
    pub(crate) fn blur(&mut self) -> bool {
        if self.state != PreviewState::Active {
            return false;
        }
        self.transition(PreviewState::Visible)
    }

    /// The panel was closed. Releases every subscription. Idempotent.
    pub fn on_panel_disposed(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.transition(PreviewState::Disposed);
        let released = self.teardown.release_all();
        debug!(session = %self.id, released, "session torn down");
    }

    /// Close the panel from the core side, cascading into disposal.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.panel.dispose();
        self.on_panel_disposed();
    }

    /// Handle a watch event. A change of the watched file posts a reload directive and
    /// returns the ticket for the new decode; deletion disposes the session.
    pub fn on_file_event(&mut self, event: &FileEvent) -> Option<DecodeTicket> {
        if self.is_disposed() {
            trace!(session = %self.id, ?event, "event after disposal ignored");
            return None;
        }
        match event {
            FileEvent::Changed(p) if *p == self.path => {
                self.panel.post_message(&HostMessage::Reload);
                self.reload()
            }
            FileEvent::Deleted(p) if *p == self.path => {
                debug!(session = %self.id, "watched file deleted");
                self.dispose();
                None
            }
            _ => None,
        }
    }

    /// Handle a message from the rendered view.
    pub fn on_message(
        &mut self,
        message: ViewMessage,
        opener: &mut dyn TextOpener,
    ) -> Option<DecodeTicket> {
        match message {
            ViewMessage::ReopenAsText => {
                if let Err(e) = opener.open_as_text(&self.path, self.panel.view_column()) {
                    warn!(session = %self.id, error = %e, "reopen as text failed");
                }
                None
            }
            ViewMessage::Reload => self.reload(),
        }
    }

    /// Apply a decode result if it is for the newest ticket and the session is still live.
    /// Returns true if the panel content was replaced.
    pub fn apply(&mut self, seq: u64, result: DecodeResult) -> bool {
        if self.is_disposed() {
            trace!(session = %self.id, seq, "stale result discarded: session disposed");
            return false;
        }
        if seq != self.latest_seq {
            trace!(session = %self.id, seq, latest = self.latest_seq, "stale result discarded");
            return false;
        }

        let header = self
            .options
            .show_file_info
            .then(|| FileInfo::gather(&self.path, self.kind));
        let document = match result {
            Ok(output) => compose_with(&output.lines, &self.options.compose, header.as_ref()),
            Err(e) => {
                warn!(session = %self.id, error = %e, "decode failed");
                compose_error(e.summary(), &e.to_string(), &self.options.compose, header.as_ref())
            }
        };
        self.panel.set_content(document.as_str());
        self.document = Some(document);
        true
    }

    /// Issue and run a decode on the current thread, applying the result.
    pub fn refresh_blocking(&mut self) -> bool {
        match self.reload() {
            Some(ticket) => {
                let response = ticket.run();
                self.apply(response.seq, response.result)
            }
            None => false,
        }
    }

    fn transition(&mut self, next: PreviewState) -> bool {
        if self.state == next {
            return false;
        }
        debug!(session = %self.id, from = ?self.state, to = ?next, "state change");
        self.state = next;
        true
    }
}
