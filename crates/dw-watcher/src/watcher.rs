//! Directory watcher with start/stop gating.
//!
//! This module provides [`DirectoryWatcher`], a thin adapter over the `notify`
//! crate's recommended OS backend.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                 notify delivery thread (OS backend)           │
//! │  ┌──────────────────┐   ┌─────────────┐   ┌───────────────┐   │
//! │  │ RecommendedWatcher│ ->│ run gate +  │ ->│ ListenerRegistry│  │
//! │  │ (raw events)     │   │ ChangeEvent │   │ (in order)    │   │
//! │  └──────────────────┘   │ + filter    │   └───────────────┘   │
//! │                         └─────────────┘                       │
//! └───────────────────────────────────────────────────────────────┘
//!                ▲ start / stop / set_filter / on_*
//!                │
//!        caller thread (owns DirectoryWatcher)
//! ```
//!
//! The OS watch is registered at construction, so setup failures surface
//! immediately. Notifications that arrive while the watcher is not running
//! are dropped at the gate. Renames that the backend reports as two separate
//! notifications are paired before dispatch, and a helper thread reports a
//! half whose partner never arrives as a move out of the tree.
//!
//! # Usage
//!
//! ```no_run
//! use dw_watcher::DirectoryWatcher;
//!
//! # fn example() -> Result<(), dw_watcher::WatchError> {
//! let watcher = DirectoryWatcher::new("/tmp/watched", "*.txt")?;
//! watcher.on_created(|path| println!("File created: {path}"));
//! watcher.on_renamed(|path| println!("File renamed: {path}"));
//!
//! watcher.start();
//! // ... wait for something ...
//! watcher.stop();
//! # Ok(())
//! # }
//! ```

use std::cell::Cell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};

use dw_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{ChangeEvent, EventCategory};
use crate::filter::PatternFilter;
use crate::listeners::ListenerRegistry;
use crate::rename::{RENAME_WINDOW, RenamePairer};

/// Lifecycle state of a [`DirectoryWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MonitorState {
    /// Constructed, never started.
    Idle = 0,
    /// Dispatching events to listeners.
    Running = 1,
    /// Stopped after running; can be started again.
    Stopped = 2,
}

impl MonitorState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

thread_local! {
    /// Set while this thread is inside a dispatch, so `stop` from a listener
    /// does not wait on the lock its own caller holds.
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as dispatching until dropped.
struct DispatchScope {
    outer: bool,
}

impl DispatchScope {
    fn enter() -> Self {
        Self {
            outer: DISPATCHING.with(|flag| flag.replace(true)),
        }
    }

    fn is_active() -> bool {
        DISPATCHING.with(Cell::get)
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(self.outer));
    }
}

/// State shared with the notify delivery thread.
struct Shared {
    state: AtomicU8,
    filter: RwLock<Arc<PatternFilter>>,
    listeners: ListenerRegistry,
    /// Held for the whole of a dispatch; `stop` takes it to wait one out.
    renames: Mutex<RenamePairer>,
}

impl Shared {
    fn is_running(&self) -> bool {
        MonitorState::from_u8(self.state.load(Ordering::Acquire)) == MonitorState::Running
    }

    /// Entry point for every raw notification.
    fn handle(&self, result: notify::Result<Event>) {
        if !self.is_running() {
            return;
        }

        let event = match result {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(error = %error, "Notification error");
                return;
            }
        };

        let mut renames = self.renames.lock();
        // stop() may have completed while this thread waited for the lock.
        if !self.is_running() {
            return;
        }
        let changes = renames.push(&event, Instant::now());
        self.dispatch_all(changes);
        if !self.is_running() {
            renames.clear();
        }
    }

    /// Reports a rename half whose partner never arrived.
    fn flush_expired(&self, now: Instant) {
        let mut renames = self.renames.lock();
        if !renames.is_waiting() {
            return;
        }
        if !self.is_running() {
            renames.clear();
            return;
        }
        if let Some(change) = renames.expire(now) {
            self.dispatch_all([change]);
        }
    }

    /// Filters and dispatches `changes` in order. The caller holds `renames`.
    fn dispatch_all(&self, changes: impl IntoIterator<Item = ChangeEvent>) {
        let _scope = DispatchScope::enter();
        let filter = Arc::clone(&*self.filter.read());
        for change in changes {
            if !change.is_accepted_by(&filter) {
                tracing::trace!(event = %change, "Filtered out change");
                continue;
            }
            // A listener may have called stop() during an earlier change.
            if !self.is_running() {
                break;
            }
            tracing::debug!(event = %change, "Dispatching change");
            self.listeners.dispatch(&change);
        }
    }
}

/// Wakes every [`RENAME_WINDOW`] to report moves out of the watch root.
///
/// Exits once the watcher is dropped.
fn spawn_rename_flusher(shared: Weak<Shared>) -> std::io::Result<()> {
    thread::Builder::new()
        .name("dirwatch-rename-flush".to_owned())
        .spawn(move || {
            loop {
                thread::sleep(RENAME_WINDOW);
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.flush_expired(Instant::now());
            }
        })?;
    Ok(())
}

/// Watches a directory subtree and invokes listeners for matching changes.
///
/// # Lifecycle
///
/// 1. **Creation**: [`DirectoryWatcher::new`] validates the root, compiles the
///    filter and registers the OS watch. The watcher starts out
///    [`MonitorState::Idle`] and dispatches nothing.
/// 2. **Subscription**: `on_created`, `on_deleted`, `on_modified` and
///    `on_renamed` add listeners at any time.
/// 3. **Monitoring**: [`start`](Self::start) and [`stop`](Self::stop) toggle
///    dispatch. Both are idempotent and can be repeated.
/// 4. **Teardown**: dropping the watcher releases the OS watch.
///
/// # Thread Safety
///
/// Listeners run on the notify delivery thread, one after another in
/// registration order. All methods take `&self`, so the watcher can be shared
/// behind an [`Arc`] and reconfigured while events are flowing.
pub struct DirectoryWatcher {
    root: Utf8PathBuf,
    recursive: bool,
    shared: Arc<Shared>,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("root", &self.root)
            .field("recursive", &self.recursive)
            .field("filter", &self.filter_pattern())
            .field("state", &self.state())
            .field("listeners", &self.shared.listeners)
            .finish_non_exhaustive()
    }
}

impl DirectoryWatcher {
    /// Creates a recursive watcher for `root` with the given filter.
    ///
    /// # Errors
    ///
    /// - [`WatchError::PathNotFound`] if `root` does not exist
    /// - [`WatchError::NotADirectory`] if `root` is not a directory
    /// - [`WatchError::InvalidFilter`] if `filter` is not a valid glob
    /// - [`WatchError::Notify`] if the OS refuses the watch
    pub fn new(root: impl AsRef<Utf8Path>, filter: &str) -> Result<Self, WatchError> {
        Self::from_config(&WatchConfig::new(root.as_ref()).with_filter(filter))
    }

    /// Creates a watcher from a [`WatchConfig`].
    pub fn from_config(config: &WatchConfig) -> Result<Self, WatchError> {
        let path = &config.root_path;
        if !path.exists() {
            return Err(WatchError::path_not_found(path.clone()));
        }
        if !path.is_dir() {
            return Err(WatchError::not_a_directory(path.clone()));
        }

        let root = path.canonicalize_utf8()?;
        let filter = PatternFilter::new(&config.filter)?;

        let shared = Arc::new(Shared {
            state: AtomicU8::new(MonitorState::Idle as u8),
            filter: RwLock::new(Arc::new(filter)),
            listeners: ListenerRegistry::new(),
            renames: Mutex::new(RenamePairer::default()),
        });

        let handler = Arc::clone(&shared);
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| handler.handle(res))?;

        let mode = if config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(root.as_std_path(), mode)?;
        spawn_rename_flusher(Arc::downgrade(&shared))?;

        tracing::info!(
            path = %root,
            filter = %config.filter,
            recursive = config.recursive,
            "Directory watch registered"
        );

        Ok(Self {
            root,
            recursive: config.recursive,
            shared,
            _watcher: watcher,
        })
    }

    /// Returns the canonical watch root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` if subdirectories are watched.
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Returns the active filter pattern.
    #[must_use]
    pub fn filter_pattern(&self) -> String {
        self.shared.filter.read().pattern().to_owned()
    }

    /// Replaces the active filter.
    ///
    /// The pattern is compiled before anything changes, so an invalid pattern
    /// leaves the previous filter in place.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidFilter`] if `pattern` is not a valid glob.
    pub fn set_filter(&self, pattern: &str) -> Result<(), WatchError> {
        let filter = PatternFilter::new(pattern)?;
        *self.shared.filter.write() = Arc::new(filter);
        tracing::debug!(filter = %pattern, "Filter updated");
        Ok(())
    }

    /// Enables dispatch to listeners. No-op if already running.
    pub fn start(&self) {
        let previous = self
            .shared
            .state
            .swap(MonitorState::Running as u8, Ordering::AcqRel);
        if MonitorState::from_u8(previous) != MonitorState::Running {
            tracing::info!(path = %self.root, "Monitoring started");
        }
    }

    /// Disables dispatch to listeners. No-op unless running.
    ///
    /// Waits for a dispatch in progress on the delivery thread to finish;
    /// nothing new is dispatched once this returns. Called from inside a
    /// listener it returns at once and the rest of that notification is
    /// skipped. Listeners, filter and the OS watch are kept so monitoring can
    /// be restarted. A rename half still waiting for its partner is dropped.
    pub fn stop(&self) {
        let _renames = if DispatchScope::is_active() {
            None
        } else {
            let mut renames = self.shared.renames.lock();
            renames.clear();
            Some(renames)
        };
        let stopped = self
            .shared
            .state
            .compare_exchange(
                MonitorState::Running as u8,
                MonitorState::Stopped as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if stopped {
            tracing::info!(path = %self.root, "Monitoring stopped");
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> MonitorState {
        MonitorState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Returns `true` while events are being dispatched.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.shared.is_running()
    }

    /// Registers a listener for created paths.
    ///
    /// Also receives the new path of every rename.
    pub fn on_created<F>(&self, listener: F)
    where
        F: Fn(&Utf8Path) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(EventCategory::Created, listener);
    }

    /// Registers a listener for deleted paths.
    pub fn on_deleted<F>(&self, listener: F)
    where
        F: Fn(&Utf8Path) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(EventCategory::Deleted, listener);
    }

    /// Registers a listener for modified paths.
    pub fn on_modified<F>(&self, listener: F)
    where
        F: Fn(&Utf8Path) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(EventCategory::Modified, listener);
    }

    /// Registers a listener for renames. It receives the old path.
    pub fn on_renamed<F>(&self, listener: F)
    where
        F: Fn(&Utf8Path) + Send + Sync + 'static,
    {
        self.shared.listeners.subscribe(EventCategory::Renamed, listener);
    }

    /// Number of listeners registered for `category`.
    pub fn listener_count(&self, category: EventCategory) -> usize {
        self.shared.listeners.len(category)
    }
}
