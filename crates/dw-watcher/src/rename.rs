//! Pairing of split rename notifications.
//!
//! Backends disagree on how a rename is reported:
//!
//! ```text
//! backend    a.txt -> b.txt                           moved out    moved in
//! ─────────  ───────────────────────────────────────  ───────────  ─────────
//! inotify    From(a)#c, To(b)#c, Both(a, b)#c          From(a)#c    To(b)#c
//! Windows    From(a), To(b)                           Remove(a)    Create(b)
//! FSEvents   Any(a) [gone], Any(b) [exists]           Any(a)       Any(b)
//! ```
//!
//! `#c` is the notify tracker (the inotify cookie). [`RenamePairer`] holds
//! back the first half of a rename until its partner arrives. A half that is
//! still waiting when an unrelated notification arrives, or after
//! [`RENAME_WINDOW`], is reported on its own as a deletion.

use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use smallvec::SmallVec;

use crate::events::{ChangeEvent, to_utf8, utf8_paths};

/// How long the first half of a rename waits for its partner.
pub(crate) const RENAME_WINDOW: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Half {
    /// `Name(From)`: the old name of a rename or a move out.
    From,
    /// `Name(Any)` for a path that no longer exists.
    Gone,
}

#[derive(Debug)]
struct Pending {
    path: Utf8PathBuf,
    tracker: Option<usize>,
    half: Half,
    since: Instant,
}

impl Pending {
    fn into_deleted(self) -> ChangeEvent {
        tracing::trace!(path = %self.path, "Unpaired rename half reported as deletion");
        ChangeEvent::Deleted(self.path)
    }

    fn pairs_with(&self, half: Half, tracker: Option<usize>) -> bool {
        self.half == half && self.tracker == tracker
    }
}

/// Turns a stream of raw notifications into change events, joining rename
/// halves that arrive as separate notifications.
#[derive(Debug, Default)]
pub(crate) struct RenamePairer {
    pending: Option<Pending>,
    /// Tracker of the last `From`/`To` pair, whose `Both` is a duplicate.
    paired: Option<usize>,
}

impl RenamePairer {
    /// Feeds one notification received at `now`.
    pub(crate) fn push(&mut self, event: &Event, now: Instant) -> SmallVec<[ChangeEvent; 2]> {
        let mut changes = SmallVec::new();
        let tracker = event.tracker();

        match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                changes.extend(self.take_pending());
                if let Some(path) = first_path(event) {
                    self.hold(path, tracker, Half::From, now);
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                let Some(to) = first_path(event) else {
                    changes.extend(self.take_pending());
                    return changes;
                };
                match self.pending.take() {
                    Some(from) if from.pairs_with(Half::From, tracker) => {
                        self.paired = tracker;
                        changes.push(ChangeEvent::Renamed { from: from.path, to });
                    }
                    other => {
                        changes.extend(other.map(Pending::into_deleted));
                        changes.push(ChangeEvent::Created(to));
                    }
                }
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                if tracker.is_some() && self.paired == tracker {
                    self.paired = None;
                    tracing::trace!(paths = ?event.paths, "Rename already reported from its halves");
                    return changes;
                }
                if let Some(pending) = self.pending.take() {
                    if !(tracker.is_some() && pending.tracker == tracker) {
                        changes.push(pending.into_deleted());
                    }
                }
                changes.extend(ChangeEvent::from_notify(event));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
                for path in utf8_paths(&event.paths) {
                    if !path.exists() {
                        changes.extend(self.take_pending());
                        self.hold(path, None, Half::Gone, now);
                        continue;
                    }
                    match self.pending.take() {
                        Some(from) if from.pairs_with(Half::Gone, None) => {
                            changes.push(ChangeEvent::Renamed { from: from.path, to: path });
                        }
                        other => {
                            changes.extend(other.map(Pending::into_deleted));
                            changes.push(ChangeEvent::Created(path));
                        }
                    }
                }
            }
            _ => {
                changes.extend(self.take_pending());
                changes.extend(ChangeEvent::from_notify(event));
            }
        }

        changes
    }

    /// Reports a half that has waited longer than [`RENAME_WINDOW`].
    pub(crate) fn expire(&mut self, now: Instant) -> Option<ChangeEvent> {
        let expired = self
            .pending
            .as_ref()
            .is_some_and(|p| now.saturating_duration_since(p.since) >= RENAME_WINDOW);
        if expired { self.take_pending() } else { None }
    }

    /// Returns `true` if a rename half is waiting for its partner.
    pub(crate) fn is_waiting(&self) -> bool {
        self.pending.is_some()
    }

    /// Forgets any half-seen rename.
    pub(crate) fn clear(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(path = %pending.path, "Discarding unpaired rename half");
        }
        self.paired = None;
    }

    fn hold(&mut self, path: Utf8PathBuf, tracker: Option<usize>, half: Half, now: Instant) {
        self.pending = Some(Pending {
            path,
            tracker,
            half,
            since: now,
        });
    }

    fn take_pending(&mut self) -> Option<ChangeEvent> {
        self.pending.take().map(Pending::into_deleted)
    }
}

fn first_path(event: &Event) -> Option<Utf8PathBuf> {
    event.paths.first().and_then(|p| to_utf8(p))
}
