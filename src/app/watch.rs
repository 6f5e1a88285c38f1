//! File-watch collaborator built on `notify`.
//!
//! The parent directory is watched instead of the file itself, so editors that save by
//! replacing the file keep producing events. Only events naming the watched path are
//! forwarded, tagged with the session they belong to.

use crate::session::{FileEvent, SessionId};

use crossbeam_channel::Sender;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{trace, warn};

use std::io;
use std::path::{Path, PathBuf};

/// Keeps the underlying watcher alive. Dropping it stops the events.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl FileWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Start forwarding change/delete events for `path` to `tx` as `(id, event)` pairs.
///
/// `path` should be absolute and canonical, since events are matched by exact path.
pub fn watch_file(
    id: SessionId,
    path: &Path,
    tx: Sender<(SessionId, FileEvent)>,
) -> io::Result<FileWatcher> {
    let target = path.to_path_buf();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let matcher = target.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Some(file_event) = to_file_event(&matcher, &event) {
                    trace!(session = %id, ?file_event, "watch event");
                    let _ = tx.send((id, file_event));
                }
            }
            Err(e) => warn!(session = %id, error = %e, "watch error"),
        },
        Config::default(),
    )
    .map_err(io::Error::other)?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(io::Error::other)?;

    Ok(FileWatcher {
        _watcher: watcher,
        path: target,
    })
}

/// Map a raw notify event onto the watched file, if it concerns it.
pub fn to_file_event(target: &Path, event: &Event) -> Option<FileEvent> {
    if !event.paths.iter().any(|p| p == target) {
        return None;
    }
    let changed = || FileEvent::Changed(target.to_path_buf());
    let deleted = || FileEvent::Deleted(target.to_path_buf());

    match event.kind {
        EventKind::Remove(_) => Some(deleted()),
        EventKind::Modify(ModifyKind::Name(_)) => {
            if target.exists() {
                Some(changed())
            } else {
                Some(deleted())
            }
        }
        EventKind::Create(_) | EventKind::Modify(_) => Some(changed()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};

    use crossbeam_channel::unbounded;
    use std::fs;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn test_event_mapping() {
        let target = Path::new("/no/such/dir/a.npy");
        let other = Path::new("/no/such/dir/b.npy");

        assert_eq!(
            to_file_event(target, &event(EventKind::Modify(ModifyKind::Data(DataChange::Any)), target)),
            Some(FileEvent::Changed(target.to_path_buf()))
        );
        assert_eq!(
            to_file_event(target, &event(EventKind::Create(CreateKind::File), target)),
            Some(FileEvent::Changed(target.to_path_buf()))
        );
        assert_eq!(
            to_file_event(target, &event(EventKind::Remove(RemoveKind::File), target)),
            Some(FileEvent::Deleted(target.to_path_buf()))
        );
        // Renamed away and gone.
        assert_eq!(
            to_file_event(
                target,
                &event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), target)
            ),
            Some(FileEvent::Deleted(target.to_path_buf()))
        );
        assert_eq!(
            to_file_event(target, &event(EventKind::Access(AccessKind::Any), target)),
            None
        );
        assert_eq!(
            to_file_event(target, &event(EventKind::Remove(RemoveKind::File), other)),
            None
        );
    }

    #[test]
    fn test_watcher_reports_changes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let root = fs::canonicalize(dir.path())?;
        let path = root.join("a.npy");
        fs::write(&path, b"v1")?;

        let (tx, rx) = unbounded();
        let id = SessionId::next();
        let watcher = watch_file(id, &path, tx)?;
        assert_eq!(watcher.path(), path.as_path());

        fs::write(root.join("unrelated.npy"), b"x")?;
        fs::write(&path, b"v2")?;

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if let Ok((got, ev)) = rx.recv_timeout(Duration::from_millis(200)) {
                assert_eq!(got, id);
                assert_eq!(ev, FileEvent::Changed(path.clone()));
                return Ok(());
            }
        }
        Err("no change event within 5s".into())
    }
}
