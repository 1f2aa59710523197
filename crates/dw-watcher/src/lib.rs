//! Directory watching with glob filtering and per-category listeners.
//!
//! This crate attaches to the OS change-notification facility through the
//! `notify` crate and turns raw notifications into four semantic events:
//! created, deleted, modified and renamed.
//!
//! # Overview
//!
//! - [`DirectoryWatcher`] registers a (recursive) watch on a root directory
//!   and gates dispatch with [`start`](DirectoryWatcher::start) /
//!   [`stop`](DirectoryWatcher::stop)
//! - [`PatternFilter`] restricts dispatch to file names matching a glob
//! - [`ListenerRegistry`] keeps ordered callbacks per [`EventCategory`]
//! - [`ChangeEvent`] is the translated notification
//!
//! # Crate Dependencies
//!
//! ```text
//! dw-cli ──► dw-watcher ──► dw-core
//! ```
//!
//! # Rename semantics
//!
//! A rename from `a` to `b` first notifies the Renamed listeners with `a`,
//! then the Created listeners with `b`. No Deleted event fires for `a` and no
//! Modified event fires for `b`. Backends that report the two names as
//! separate notifications are paired up first; a half with no partner is a
//! move across the watch root and is reported as Deleted or Created.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use camino::{Utf8Path, Utf8PathBuf};
//! use dw_watcher::{ChangeEvent, EventCategory, ListenerRegistry};
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let registry = ListenerRegistry::new();
//! for category in EventCategory::ALL {
//!     let seen = Arc::clone(&seen);
//!     registry.subscribe(category, move |path: &Utf8Path| {
//!         if let Ok(mut seen) = seen.lock() {
//!             seen.push(format!("{category} {path}"));
//!         }
//!     });
//! }
//!
//! registry.dispatch(&ChangeEvent::Renamed {
//!     from: Utf8PathBuf::from("/w/a.txt"),
//!     to: Utf8PathBuf::from("/w/b.txt"),
//! });
//!
//! let seen = seen.lock().map(|s| s.clone()).unwrap_or_default();
//! assert_eq!(seen, ["renamed /w/a.txt", "created /w/b.txt"]);
//! ```
//!
//! # Error Handling
//!
//! Setup failures and invalid filters are returned as [`WatchError`] to the
//! caller. Listener panics are contained and logged; see [`listeners`].

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod listeners;
mod rename;
pub mod watcher;

pub use error::WatchError;
pub use events::{ChangeEvent, EventCategory};
pub use filter::PatternFilter;
pub use listeners::{Listener, ListenerRegistry};
pub use watcher::{DirectoryWatcher, MonitorState};
