//! The Session Registry.
//!
//! Owns every live [PreviewSession] and a non-owning focus reference to at most one of them.
//! Host events are routed through the registry by session id; whenever a session ends up
//! `Disposed` it is unregistered on the spot and the focus reference is cleared with it.
//!
//! Operations take `&mut self`. A host that delivers events from several threads wraps the
//! registry in a `Mutex`, which serializes registration, unregistration and focus changes.

use crate::core::worker::{DecodeResponse, DecodeTicket};
use crate::session::panel::{TextOpener, ViewMessage};
use crate::session::state::{FileEvent, PreviewSession, PreviewState, SessionId};

use thiserror::Error;
use tracing::{debug, trace};

use std::collections::HashMap;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("session {0} is already registered")]
    AlreadyRegistered(SessionId),
    #[error("session {0} is not registered")]
    UnknownSession(SessionId),
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, PreviewSession>,
    focus: Option<SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a session. Its panel's current focus is applied right away.
    pub fn register(&mut self, session: PreviewSession) -> Result<SessionId, RegistryError> {
        let id = session.id();
        if self.sessions.contains_key(&id) {
            return Err(RegistryError::AlreadyRegistered(id));
        }
        self.sessions.insert(id, session);
        debug!(session = %id, live = self.sessions.len(), "registered");
        self.view_state_changed(id)?;
        Ok(id)
    }

    /// Remove a session, clearing focus if it pointed at it.
    pub fn unregister(&mut self, id: SessionId) -> Result<PreviewSession, RegistryError> {
        let session = self
            .sessions
            .remove(&id)
            .ok_or(RegistryError::UnknownSession(id))?;
        if self.focus == Some(id) {
            self.focus = None;
        }
        debug!(session = %id, live = self.sessions.len(), "unregistered");
        Ok(session)
    }

    /// Point focus at a live session, or clear it.
    ///
    /// The target becomes `Active` and every other session is demoted, so focus and the
    /// `Active` state never disagree.
    pub fn set_focus(&mut self, id: Option<SessionId>) -> Result<(), RegistryError> {
        match id {
            Some(id) => {
                self.session_mut(id)?.activate();
                self.demote_others(id);
                self.focus = Some(id);
            }
            None => {
                if let Some(prev) = self.focus.take()
                    && let Some(s) = self.sessions.get_mut(&prev)
                {
                    s.blur();
                }
            }
        }
        Ok(())
    }

    pub fn focus(&self) -> Option<SessionId> {
        self.focus
    }

    pub fn focused(&self) -> Option<&PreviewSession> {
        self.focus.and_then(|id| self.sessions.get(&id))
    }

    pub fn get(&self, id: SessionId) -> Option<&PreviewSession> {
        self.sessions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Live session ids in creation order.
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The panel of `id` reported a focus change.
    ///
    /// Gaining focus moves the registry focus to it and demotes whichever session was
    /// `Active` before. Losing focus clears the reference if it pointed here.
    pub fn view_state_changed(&mut self, id: SessionId) -> Result<(), RegistryError> {
        let session = self.session_mut(id)?;
        session.on_view_state_changed();
        let state = session.state();

        match state {
            PreviewState::Active => {
                self.demote_others(id);
                self.focus = Some(id);
            }
            PreviewState::Visible if self.focus == Some(id) => self.focus = None,
            _ => {}
        }
        self.settle(id);
        Ok(())
    }

    /// The panel of `id` was closed by the user.
    pub fn panel_disposed(&mut self, id: SessionId) -> Result<(), RegistryError> {
        self.session_mut(id)?.on_panel_disposed();
        self.settle(id);
        Ok(())
    }

    pub fn file_event(
        &mut self,
        id: SessionId,
        event: &FileEvent,
    ) -> Result<Option<DecodeTicket>, RegistryError> {
        let ticket = self.session_mut(id)?.on_file_event(event);
        self.settle(id);
        Ok(ticket)
    }

    pub fn message(
        &mut self,
        id: SessionId,
        message: ViewMessage,
        opener: &mut dyn TextOpener,
    ) -> Result<Option<DecodeTicket>, RegistryError> {
        let ticket = self.session_mut(id)?.on_message(message, opener);
        self.settle(id);
        Ok(ticket)
    }

    /// Route a finished decode to its session. Results for sessions that are gone are
    /// dropped. Returns true if a panel was updated.
    pub fn complete(&mut self, response: DecodeResponse) -> bool {
        match self.sessions.get_mut(&response.session) {
            Some(session) => session.apply(response.seq, response.result),
            None => {
                trace!(session = %response.session, seq = response.seq, "result for unregistered session discarded");
                false
            }
        }
    }

    /// Dispose every live session, e.g. on host shutdown.
    pub fn dispose_all(&mut self) {
        for id in self.ids() {
            if let Some(s) = self.sessions.get_mut(&id) {
                s.dispose();
            }
            self.settle(id);
        }
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut PreviewSession, RegistryError> {
        self.sessions
            .get_mut(&id)
            .ok_or(RegistryError::UnknownSession(id))
    }

    fn demote_others(&mut self, id: SessionId) {
        for (other, s) in self.sessions.iter_mut() {
            if *other != id {
                s.blur();
            }
        }
    }

    /// Unregister `id` if it reached `Disposed`.
    fn settle(&mut self, id: SessionId) {
        if self.sessions.get(&id).is_some_and(PreviewSession::is_disposed) {
            let _ = self.unregister(id);
        }
    }
}
