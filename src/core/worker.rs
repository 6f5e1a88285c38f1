//! Worker threads for decoder invocations.
//!
//! Decodes run on background threads so the host's event loop never blocks on the interpreter.
//! [DecodeTicket]s come in from sessions via a channel, and [DecodeResponse]s go back the same
//! way, tagged with the session id and sequence number they were issued with.
//!
//! Workers never decide whether a result is still wanted. That is the session's job: it only
//! applies a response whose sequence number is still the latest one it issued.
//!
//! # Caution:
//! This module is a protocol boundary between sessions and the decoder gateway. Changing the
//! ticket or response shape requires matching changes in the session registry and the host loop.

use crate::core::format::FormatKind;
use crate::core::proc::{DecodeResult, DecoderSettings, invoke};
use crate::session::SessionId;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tracing::{debug, trace};

use std::thread;

/// One pending decode for a session.
#[derive(Debug, Clone)]
pub struct DecodeTicket {
    pub session: SessionId,
    pub seq: u64,
    pub kind: FormatKind,
    pub path: String,
    pub settings: DecoderSettings,
}

impl DecodeTicket {
    /// Run the decode on the current thread.
    pub fn run(self) -> DecodeResponse {
        let result = invoke(self.kind, &self.path, &self.settings);
        DecodeResponse {
            session: self.session,
            seq: self.seq,
            result,
        }
    }
}

/// The outcome of a ticket, routed back to its session.
#[derive(Debug)]
pub struct DecodeResponse {
    pub session: SessionId,
    pub seq: u64,
    pub result: DecodeResult,
}

/// Manages the decode worker threads and their channels.
///
/// All workers share one task queue. A worker that wakes up drains whatever is queued and keeps
/// only the newest ticket per session, so rapid file changes do not pile up interpreter runs.
pub struct Workers {
    decode_tx: Sender<DecodeTicket>,
    response_rx: Receiver<DecodeResponse>,
}

impl Workers {
    /// Create the worker set with `count` decode threads (at least one).
    pub fn spawn(count: usize) -> Self {
        let (decode_tx, decode_rx) = unbounded::<DecodeTicket>();
        let (res_tx, response_rx) = unbounded::<DecodeResponse>();

        for _ in 0..count.max(1) {
            start_decode_worker(decode_rx.clone(), res_tx.clone());
        }

        Self {
            decode_tx,
            response_rx,
        }
    }

    /// Queue a ticket. Returns false if every worker has gone away.
    pub fn submit(&self, ticket: DecodeTicket) -> bool {
        self.decode_tx.send(ticket).is_ok()
    }

    /// Accessor for the decode task sender.
    pub fn decode_tx(&self) -> &Sender<DecodeTicket> {
        &self.decode_tx
    }

    /// Accessor for the worker response receiver.
    pub fn response_rx(&self) -> &Receiver<DecodeResponse> {
        &self.response_rx
    }
}

/// Starts a decode worker thread.
///
/// # Arguments
/// * `task_rx` - Receiver channel for incoming tickets
/// * `res_tx` - Sender channel for outgoing responses
fn start_decode_worker(task_rx: Receiver<DecodeTicket>, res_tx: Sender<DecodeResponse>) {
    thread::spawn(move || {
        while let Ok(first) = task_rx.recv() {
            for ticket in coalesce(first, &task_rx) {
                debug!(session = %ticket.session, seq = ticket.seq, "decoding");
                if res_tx.send(ticket.run()).is_err() {
                    return;
                }
            }
        }
    });
}

/// Drain queued tickets, keeping only the newest one per session in first-seen order.
pub(crate) fn coalesce(first: DecodeTicket, task_rx: &Receiver<DecodeTicket>) -> Vec<DecodeTicket> {
    let mut batch = vec![first];
    while let Ok(next) = task_rx.try_recv() {
        match batch.iter_mut().find(|t| t.session == next.session) {
            Some(slot) if slot.seq < next.seq => {
                trace!(session = %next.session, dropped = slot.seq, kept = next.seq, "coalesced");
                *slot = next;
            }
            Some(_) => {}
            None => batch.push(next),
        }
    }
    batch
}

/// Worker threads integration tests.
#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn ticket(session: SessionId, seq: u64, settings: &DecoderSettings, path: &str) -> DecodeTicket {
        DecodeTicket {
            session,
            seq,
            kind: FormatKind::NumericArray,
            path: path.to_string(),
            settings: settings.clone(),
        }
    }

    fn sh_settings(script: &Path) -> DecoderSettings {
        DecoderSettings {
            interpreter: Some("sh".into()),
            script: Some(script.to_string_lossy().into_owned()),
            ..DecoderSettings::default()
        }
    }

    #[test]
    fn test_coalesce_keeps_newest_per_session() -> Result<(), Box<dyn std::error::Error>> {
        let settings = DecoderSettings::default();
        let a = SessionId::next();
        let b = SessionId::next();
        let (tx, rx) = unbounded();
        tx.send(ticket(a, 2, &settings, "a"))?;
        tx.send(ticket(b, 1, &settings, "b"))?;
        tx.send(ticket(a, 3, &settings, "a"))?;
        tx.send(ticket(b, 0, &settings, "b"))?;

        let batch = coalesce(ticket(a, 1, &settings, "a"), &rx);
        let seen: Vec<_> = batch.iter().map(|t| (t.session, t.seq)).collect();
        assert_eq!(seen, vec![(a, 3), (b, 1)]);
        Ok(())
    }

    #[test]
    fn test_worker_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        if !cfg!(unix) || which::which("sh").is_err() {
            return Ok(());
        }
        let dir = tempdir()?;
        let script = dir.path().join("decoder.sh");
        fs::write(&script, "echo \"decoded $2\"\n")?;

        let workers = Workers::spawn(2);
        let session = SessionId::next();
        assert!(workers.submit(ticket(session, 7, &sh_settings(&script), "x.npy")));

        let response = workers.response_rx().recv_timeout(Duration::from_secs(5))?;
        assert_eq!(response.session, session);
        assert_eq!(response.seq, 7);
        match response.result {
            Ok(out) => assert_eq!(out.lines, vec!["decoded x.npy"]),
            Err(e) => return Err(format!("unexpected decode failure: {e}").into()),
        }
        Ok(())
    }

    #[test]
    fn test_worker_reports_failures() -> Result<(), Box<dyn std::error::Error>> {
        let settings = DecoderSettings {
            interpreter: Some("/no/such/interpreter".into()),
            ..DecoderSettings::default()
        };
        let workers = Workers::spawn(1);
        let session = SessionId::next();
        workers.submit(ticket(session, 1, &settings, "x.npy"));

        let response = workers.response_rx().recv_timeout(Duration::from_secs(5))?;
        assert_eq!(response.seq, 1);
        assert!(response.result.is_err());
        Ok(())
    }
}
