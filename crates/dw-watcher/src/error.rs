//! Error types for the dw-watcher crate.
//!
//! This module provides the [`WatchError`] type for everything that can go
//! wrong while setting up a watch, changing its filter, or dispatching events.

use camino::Utf8PathBuf;

use crate::events::EventCategory;

/// Errors that can occur during directory watching.
///
/// # Error Recovery Strategy
///
/// - **Setup errors** ([`WatchError::PathNotFound`], [`WatchError::NotADirectory`],
///   [`WatchError::Notify`], [`WatchError::Io`]): Fatal - no watcher is created
/// - **Invalid filter** ([`WatchError::InvalidFilter`]): Returned to the caller,
///   the previous filter stays active
/// - **Listener failure** ([`WatchError::Listener`]): Logged on the notify
///   thread, remaining listeners still run
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
///
/// # Examples
///
/// ```
/// use dw_watcher::WatchError;
///
/// fn handle_error(err: &WatchError) {
///     if err.is_setup() {
///         eprintln!("Could not start watching: {err}");
///     } else {
///         eprintln!("Warning: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The OS notification facility refused or failed the watch.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watch root does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The watch root exists but is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// The filter pattern is not a valid glob.
    #[error("invalid filter pattern '{pattern}': {source}")]
    InvalidFilter {
        /// The rejected pattern.
        pattern: String,
        /// The parse failure reported by `globset`.
        #[source]
        source: globset::Error,
    },

    /// A listener panicked while handling an event.
    #[error("{category} listener failed: {message}")]
    Listener {
        /// Category of the listener that failed.
        category: EventCategory,
        /// Panic payload, if it was a string.
        message: String,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred while resolving the watch root.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NotADirectory`] error.
    #[inline]
    pub fn not_a_directory(path: impl Into<Utf8PathBuf>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Creates a new [`WatchError::InvalidFilter`] error.
    #[inline]
    pub fn invalid_filter(pattern: impl Into<String>, source: globset::Error) -> Self {
        Self::InvalidFilter {
            pattern: pattern.into(),
            source,
        }
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns `true` if this error prevented a watcher from being created.
    #[inline]
    #[must_use]
    pub const fn is_setup(&self) -> bool {
        matches!(
            self,
            Self::Notify(_) | Self::PathNotFound(_) | Self::NotADirectory(_) | Self::Io(_)
        )
    }

    /// Returns `true` if watching can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NonUtf8Path(_) | Self::Listener { .. } | Self::InvalidFilter { .. }
        )
    }

    /// Returns `true` if this error is fatal.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::NotADirectory(path) => Some(path),
            Self::Notify(_)
            | Self::InvalidFilter { .. }
            | Self::Listener { .. }
            | Self::NonUtf8Path(_)
            | Self::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    fn bad_glob() -> globset::Error {
        match globset::Glob::new("[unclosed") {
            Err(err) => err,
            Ok(_) => panic!("pattern should not compile"),
        }
    }

    #[test]
    fn test_watch_error_path_not_found() {
        let err = WatchError::path_not_found("/tmp/missing");
        assert!(err.is_setup());
        assert!(err.is_fatal());
        assert_eq!(err.path().map(|p| p.as_str()), Some("/tmp/missing"));
        assert_eq!(err.to_string(), "path does not exist: /tmp/missing");
    }

    #[test]
    fn test_watch_error_not_a_directory() {
        let err = WatchError::not_a_directory("/etc/hosts");
        assert!(err.is_setup());
        assert_eq!(err.path().map(|p| p.as_str()), Some("/etc/hosts"));
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_watch_error_invalid_filter() {
        let err = WatchError::invalid_filter("[unclosed", bad_glob());
        assert!(!err.is_setup());
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
        assert!(err.to_string().contains("[unclosed"));
    }

    #[test]
    fn test_watch_error_listener() {
        let err = WatchError::Listener {
            category: EventCategory::Renamed,
            message: "boom".to_owned(),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "renamed listener failed: boom");
    }

    #[test]
    fn test_watch_error_non_utf8() {
        let err = WatchError::non_utf8_path(PathBuf::from("test"));
        assert!(err.is_recoverable());
        assert!(!err.is_setup());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_watch_error_io() {
        let err = WatchError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        assert!(err.is_setup());
        assert!(err.is_fatal());
        assert!(err.path().is_none());
        assert!(err.to_string().contains("I/O error"));
    }
}
