//! Semantic change events.
//!
//! The OS facility reports a wide range of raw notification kinds. This module
//! folds them into the four categories listeners subscribe to.
//!
//! # Translation
//!
//! ```text
//! notify::EventKind                          ChangeEvent
//! ─────────────────────────────────────────  ──────────────────────────
//! Create(_)                                  Created(p)
//! Remove(_)                                  Deleted(p)
//! Modify(Data | Metadata(WriteTime|Any)|Any) Modified(p)
//! Modify(Name(Both))  [old, new]             Renamed { from, to }
//! Modify(Name(From))  (no partner)           Deleted(p)   moved out
//! Modify(Name(To))    (no partner)           Created(p)   moved in
//! Modify(Name(Any))   (no partner)           Created(p) or Deleted(p)
//! Access, Other, other metadata              (ignored)
//! ```
//!
//! [`ChangeEvent::from_notify`] looks at one notification at a time. Backends
//! that report a rename as two separate halves are paired up by the watcher
//! before falling back to this table.

use std::fmt;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use notify::event::{MetadataKind, ModifyKind, RenameMode};
use notify::{Event, EventKind};
use smallvec::SmallVec;

use crate::error::WatchError;
use crate::filter::PatternFilter;

/// The four event categories listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// A file or directory appeared.
    Created,
    /// A file or directory was removed.
    Deleted,
    /// File contents or last-write time changed.
    Modified,
    /// A file or directory was renamed (reported with its old path).
    Renamed,
}

impl EventCategory {
    /// All categories, in registry order.
    pub const ALL: [Self; 4] = [Self::Created, Self::Deleted, Self::Modified, Self::Renamed];

    /// Lowercase name used in logs and messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Deleted => "deleted",
            Self::Modified => "modified",
            Self::Renamed => "renamed",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Created => 0,
            Self::Deleted => 1,
            Self::Modified => 2,
            Self::Renamed => 3,
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A change under the watch root.
///
/// # Examples
///
/// ```
/// use dw_watcher::{ChangeEvent, EventCategory};
/// use camino::Utf8PathBuf;
///
/// let event = ChangeEvent::Renamed {
///     from: Utf8PathBuf::from("/tmp/watched/a.txt"),
///     to: Utf8PathBuf::from("/tmp/watched/b.txt"),
/// };
/// assert_eq!(event.category(), EventCategory::Renamed);
/// assert_eq!(event.path().as_str(), "/tmp/watched/a.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    /// A path was created.
    Created(Utf8PathBuf),
    /// A path was deleted.
    Deleted(Utf8PathBuf),
    /// A path was written to.
    Modified(Utf8PathBuf),
    /// A path was renamed from `from` to `to`.
    Renamed {
        /// The path before the rename.
        from: Utf8PathBuf,
        /// The path after the rename.
        to: Utf8PathBuf,
    },
}

impl ChangeEvent {
    /// Returns the category this event belongs to.
    #[must_use]
    pub const fn category(&self) -> EventCategory {
        match self {
            Self::Created(_) => EventCategory::Created,
            Self::Deleted(_) => EventCategory::Deleted,
            Self::Modified(_) => EventCategory::Modified,
            Self::Renamed { .. } => EventCategory::Renamed,
        }
    }

    /// Returns the primary path: the changed path, or the old path of a rename.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Created(path) | Self::Deleted(path) | Self::Modified(path) => path,
            Self::Renamed { from, .. } => from,
        }
    }

    /// Returns `true` if `filter` lets this event through.
    ///
    /// A rename passes when either its old or its new name matches.
    pub fn is_accepted_by(&self, filter: &PatternFilter) -> bool {
        match self {
            Self::Created(path) | Self::Deleted(path) | Self::Modified(path) => {
                filter.matches(path)
            }
            Self::Renamed { from, to } => filter.matches(from) || filter.matches(to),
        }
    }

    /// Translates a single raw notification into change events.
    ///
    /// Rename halves are read as moves across the watch root: a lone `From`
    /// is a deletion and a lone `To` a creation. Non-UTF-8 paths are logged
    /// and skipped. Notification kinds outside the table in the module docs
    /// produce no events.
    pub fn from_notify(event: &Event) -> SmallVec<[Self; 2]> {
        let mut changes = SmallVec::new();

        match event.kind {
            EventKind::Create(_) => {
                changes.extend(utf8_paths(&event.paths).map(Self::Created));
            }
            EventKind::Remove(_) => {
                changes.extend(utf8_paths(&event.paths).map(Self::Deleted));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if let [from, to] = event.paths.as_slice() {
                    if let (Some(from), Some(to)) = (to_utf8(from), to_utf8(to)) {
                        changes.push(Self::Renamed { from, to });
                    }
                } else {
                    tracing::trace!(paths = ?event.paths, "Rename without a path pair");
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                changes.extend(utf8_paths(&event.paths).map(Self::Deleted));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                changes.extend(utf8_paths(&event.paths).map(Self::Created));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
                changes.extend(utf8_paths(&event.paths).map(|path| {
                    if path.exists() {
                        Self::Created(path)
                    } else {
                        Self::Deleted(path)
                    }
                }));
            }
            EventKind::Modify(
                ModifyKind::Data(_)
                | ModifyKind::Metadata(MetadataKind::WriteTime | MetadataKind::Any)
                | ModifyKind::Any,
            ) => {
                changes.extend(utf8_paths(&event.paths).map(Self::Modified));
            }
            _ => {
                tracing::trace!(kind = ?event.kind, paths = ?event.paths, "Ignoring notification");
            }
        }

        changes
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed { from, to } => write!(f, "renamed: {from} -> {to}"),
            other => write!(f, "{}: {}", other.category(), other.path()),
        }
    }
}

pub(crate) fn to_utf8(path: &Path) -> Option<Utf8PathBuf> {
    match Utf8PathBuf::from_path_buf(path.to_path_buf()) {
        Ok(path) => Some(path),
        Err(invalid) => {
            let err = WatchError::non_utf8_path(invalid);
            tracing::warn!(error = %err, "Skipping non-UTF-8 path in file event");
            None
        }
    }
}

pub(crate) fn utf8_paths(paths: &[PathBuf]) -> impl Iterator<Item = Utf8PathBuf> + '_ {
    paths.iter().filter_map(|p| to_utf8(p))
}
