//! Scoped subscriptions tied to a session's lifetime.
//!
//! A [Subscription] wraps one release action (closing a file watcher, detaching a panel handler)
//! that runs exactly once: either through [Subscription::release] or when it is dropped.
//! A [Teardown] list collects them so a session can release everything on disposal.

use std::fmt;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// A single release action that runs at most once.
pub struct Subscription {
    label: &'static str,
    release: Option<ReleaseFn>,
}

impl Subscription {
    pub fn new(label: &'static str, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            label,
            release: Some(Box::new(release)),
        }
    }

    /// Keeps a value alive until release, then drops it.
    /// Handy for RAII handles such as file watchers.
    pub fn holding<T: Send + 'static>(label: &'static str, value: T) -> Self {
        Self::new(label, move || drop(value))
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    /// Run the release action. Returns false if it already ran.
    pub fn release(&mut self) -> bool {
        match self.release.take() {
            Some(f) => {
                f();
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Ordered list of subscriptions released together.
#[derive(Debug, Default)]
pub struct Teardown {
    subs: Vec<Subscription>,
    done: bool,
}

impl Teardown {
    /// Register a subscription. After [Teardown::release_all] it is released immediately.
    pub fn push(&mut self, mut sub: Subscription) {
        if self.done {
            sub.release();
            return;
        }
        self.subs.push(sub);
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Release everything in reverse registration order. Returns how many actions ran.
    pub fn release_all(&mut self) -> usize {
        self.done = true;
        let mut released = 0;
        while let Some(mut sub) = self.subs.pop() {
            if sub.release() {
                released += 1;
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |name: &'static str| {
            let sink = Arc::clone(&sink);
            Subscription::new(name, move || sink.lock().unwrap().push(name))
        };
        (log, make)
    }

    #[test]
    fn test_release_runs_once() {
        let (log, make) = recorder();
        let mut sub = make("watch");
        assert!(sub.release());
        assert!(!sub.release());
        drop(sub);
        assert_eq!(*log.lock().unwrap(), vec!["watch"]);
    }

    #[test]
    fn test_drop_releases() {
        let (log, make) = recorder();
        {
            let _sub = make("panel");
        }
        assert_eq!(*log.lock().unwrap(), vec!["panel"]);
    }

    #[test]
    fn test_teardown_reverse_order_and_late_push() {
        let (log, make) = recorder();
        let mut teardown = Teardown::default();
        teardown.push(make("first"));
        teardown.push(make("second"));
        assert_eq!(teardown.len(), 2);

        assert_eq!(teardown.release_all(), 2);
        assert_eq!(teardown.release_all(), 0);
        assert!(teardown.is_empty());

        teardown.push(make("late"));
        assert!(teardown.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["second", "first", "late"]);
    }
}
