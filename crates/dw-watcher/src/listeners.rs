//! Listener registry and dispatch.
//!
//! Each [`EventCategory`] owns an ordered list of callbacks. Dispatching a
//! category invokes every callback in registration order, synchronously, on
//! the calling thread.
//!
//! # Failure isolation
//!
//! A listener that panics is caught at the invocation boundary, reported as
//! [`WatchError::Listener`] at `error` level, and the remaining listeners
//! still run. Nothing unwinds into the notify delivery thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::RwLock;

use crate::error::WatchError;
use crate::events::{ChangeEvent, EventCategory};

/// A registered event callback.
pub type Listener = Arc<dyn Fn(&Utf8Path) + Send + Sync + 'static>;

/// Ordered callbacks for each event category.
///
/// # Examples
///
/// ```
/// use dw_watcher::{EventCategory, ListenerRegistry};
/// use camino::Utf8Path;
///
/// let registry = ListenerRegistry::new();
/// registry.subscribe(EventCategory::Created, |path: &Utf8Path| {
///     println!("File created: {path}");
/// });
/// assert_eq!(registry.len(EventCategory::Created), 1);
/// ```
#[derive(Default)]
pub struct ListenerRegistry {
    slots: [RwLock<Vec<Listener>>; 4],
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for category in EventCategory::ALL {
            map.entry(&category.label(), &self.len(category));
        }
        map.finish()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to the list for `category`.
    ///
    /// Safe to call while events are being dispatched, including from inside
    /// a listener; the new listener sees events dispatched afterwards.
    pub fn subscribe<F>(&self, category: EventCategory, listener: F)
    where
        F: Fn(&Utf8Path) + Send + Sync + 'static,
    {
        self.slots[category.index()].write().push(Arc::new(listener));
    }

    /// Number of listeners registered for `category`.
    pub fn len(&self, category: EventCategory) -> usize {
        self.slots[category.index()].read().len()
    }

    /// Returns `true` if no category has any listener.
    pub fn is_empty(&self) -> bool {
        EventCategory::ALL.iter().all(|c| self.len(*c) == 0)
    }

    /// Invokes every listener for `category` with `path`.
    ///
    /// Returns the number of listeners that panicked.
    pub fn notify(&self, category: EventCategory, path: &Utf8Path) -> usize {
        // Snapshot so listeners can subscribe without deadlocking.
        let listeners: Vec<Listener> = self.slots[category.index()].read().clone();

        let mut failures = 0;
        for listener in &listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(path))) {
                failures += 1;
                let err = WatchError::Listener {
                    category,
                    message: panic_message(payload.as_ref()),
                };
                tracing::error!(error = %err, path = %path, "Listener panicked");
            }
        }
        failures
    }

    /// Dispatches a change event to its listeners.
    ///
    /// A rename notifies the Renamed listeners with the old path, then the
    /// Created listeners with the new path. It never reaches the Deleted or
    /// Modified listeners. Both halves belong to one change, so the Created
    /// half runs even if a Renamed listener stops the watcher.
    ///
    /// Returns the number of listeners that panicked.
    pub fn dispatch(&self, event: &ChangeEvent) -> usize {
        match event {
            ChangeEvent::Created(path) => self.notify(EventCategory::Created, path),
            ChangeEvent::Deleted(path) => self.notify(EventCategory::Deleted, path),
            ChangeEvent::Modified(path) => self.notify(EventCategory::Modified, path),
            ChangeEvent::Renamed { from, to } => {
                self.notify(EventCategory::Renamed, from) + self.notify(EventCategory::Created, to)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> impl Fn(&Utf8Path) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |path: &Utf8Path| log.lock().push(format!("{tag} {path}"))
    }

    #[test]
    fn test_empty_registry() {
        let registry = ListenerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.notify(EventCategory::Created, Utf8Path::new("/w/a")), 0);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let log = Log::default();
        let registry = ListenerRegistry::new();
        registry.subscribe(EventCategory::Created, recorder(&log, "first"));
        registry.subscribe(EventCategory::Created, recorder(&log, "second"));
        registry.subscribe(EventCategory::Created, recorder(&log, "first"));

        registry.dispatch(&ChangeEvent::Created(Utf8PathBuf::from("/w/a.txt")));

        assert_eq!(
            *log.lock(),
            ["first /w/a.txt", "second /w/a.txt", "first /w/a.txt"]
        );
    }

    #[test]
    fn test_categories_are_independent() {
        let log = Log::default();
        let registry = ListenerRegistry::new();
        registry.subscribe(EventCategory::Created, recorder(&log, "created"));
        registry.subscribe(EventCategory::Deleted, recorder(&log, "deleted"));
        registry.subscribe(EventCategory::Modified, recorder(&log, "modified"));

        registry.dispatch(&ChangeEvent::Modified(Utf8PathBuf::from("/w/a.txt")));
        registry.dispatch(&ChangeEvent::Deleted(Utf8PathBuf::from("/w/b.txt")));

        assert_eq!(*log.lock(), ["modified /w/a.txt", "deleted /w/b.txt"]);
    }

    #[test]
    fn test_rename_dispatches_renamed_then_created() {
        let log = Log::default();
        let registry = ListenerRegistry::new();
        for (category, tag) in [
            (EventCategory::Created, "created"),
            (EventCategory::Deleted, "deleted"),
            (EventCategory::Modified, "modified"),
            (EventCategory::Renamed, "renamed"),
        ] {
            registry.subscribe(category, recorder(&log, tag));
        }

        registry.dispatch(&ChangeEvent::Renamed {
            from: Utf8PathBuf::from("/w/a.txt"),
            to: Utf8PathBuf::from("/w/b.txt"),
        });

        assert_eq!(*log.lock(), ["renamed /w/a.txt", "created /w/b.txt"]);
    }

    #[test]
    fn test_panicking_listener_is_contained() {
        let log = Log::default();
        let registry = ListenerRegistry::new();
        registry.subscribe(EventCategory::Deleted, recorder(&log, "before"));
        registry.subscribe(EventCategory::Deleted, |_path: &Utf8Path| {
            panic!("listener exploded");
        });
        registry.subscribe(EventCategory::Deleted, recorder(&log, "after"));

        let failures = registry.dispatch(&ChangeEvent::Deleted(Utf8PathBuf::from("/w/x")));

        assert_eq!(failures, 1);
        assert_eq!(*log.lock(), ["before /w/x", "after /w/x"]);
    }

    #[test]
    fn test_subscribe_from_inside_listener() {
        let log = Log::default();
        let registry = Arc::new(ListenerRegistry::new());

        let inner_registry = Arc::clone(&registry);
        let inner_log = Arc::clone(&log);
        registry.subscribe(EventCategory::Created, move |_path: &Utf8Path| {
            inner_registry.subscribe(EventCategory::Created, recorder(&inner_log, "late"));
        });

        registry.dispatch(&ChangeEvent::Created(Utf8PathBuf::from("/w/1")));
        assert!(log.lock().is_empty());
        assert_eq!(registry.len(EventCategory::Created), 2);

        registry.dispatch(&ChangeEvent::Created(Utf8PathBuf::from("/w/2")));
        assert_eq!(*log.lock(), ["late /w/2"]);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
