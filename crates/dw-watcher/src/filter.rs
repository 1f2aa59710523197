//! File name filtering for watch events.
//!
//! A [`PatternFilter`] holds one glob that is matched against the *file name*
//! of each changed path, never against the directory part. `*.txt` therefore
//! matches `/tmp/watched/a.txt` as well as `/tmp/watched/nested/b.txt`.
//!
//! The empty pattern and `*.*` both match every file, including names
//! without an extension.
//!
//! # Examples
//!
//! ```
//! use dw_watcher::PatternFilter;
//! use camino::Utf8Path;
//!
//! let filter = PatternFilter::new("*.txt")?;
//! assert!(filter.matches(Utf8Path::new("/tmp/watched/a.txt")));
//! assert!(!filter.matches(Utf8Path::new("/tmp/watched/a.bin")));
//! # Ok::<(), dw_watcher::WatchError>(())
//! ```

use camino::Utf8Path;
use globset::{GlobBuilder, GlobMatcher};

use crate::error::WatchError;

/// Patterns treated as "every file".
const MATCH_ALL_ALIASES: [&str; 3] = ["", "*", "*.*"];

/// A compiled glob over file names.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    /// The pattern as given by the caller.
    pattern: String,

    /// `None` when the pattern matches everything.
    matcher: Option<GlobMatcher>,
}

impl PatternFilter {
    /// Compiles `pattern` into a filter.
    ///
    /// Matching is case-insensitive on Windows and case-sensitive elsewhere.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::InvalidFilter`] if the pattern is not a valid glob.
    pub fn new(pattern: &str) -> Result<Self, WatchError> {
        if MATCH_ALL_ALIASES.contains(&pattern) {
            return Ok(Self {
                pattern: pattern.to_owned(),
                matcher: None,
            });
        }

        let glob = GlobBuilder::new(pattern)
            .case_insensitive(cfg!(windows))
            .literal_separator(true)
            .build()
            .map_err(|e| WatchError::invalid_filter(pattern, e))?;

        Ok(Self {
            pattern: pattern.to_owned(),
            matcher: Some(glob.compile_matcher()),
        })
    }

    /// A filter that accepts every path.
    #[must_use]
    pub fn match_all() -> Self {
        Self {
            pattern: dw_core::DEFAULT_FILTER.to_owned(),
            matcher: None,
        }
    }

    /// Returns the pattern this filter was built from.
    #[inline]
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` if this filter accepts every path.
    #[inline]
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.matcher.is_none()
    }

    /// Returns `true` if the file name of `path` matches the pattern.
    ///
    /// Paths without a file name component (such as `/`) are matched whole.
    pub fn matches(&self, path: &Utf8Path) -> bool {
        let Some(matcher) = &self.matcher else {
            return true;
        };
        let name = path.file_name().unwrap_or(path.as_str());
        matcher.is_match(name)
    }
}

impl Default for PatternFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_all_aliases() {
        for pattern in ["", "*", "*.*"] {
            let filter = PatternFilter::new(pattern).expect("valid pattern");
            assert!(filter.is_match_all(), "{pattern:?} should match all");
            assert!(filter.matches(Utf8Path::new("/tmp/Makefile")));
            assert!(filter.matches(Utf8Path::new("/tmp/a.txt")));
        }
    }

    #[test]
    fn test_default_is_match_all() {
        let filter = PatternFilter::default();
        assert_eq!(filter.pattern(), "*");
        assert!(filter.matches(Utf8Path::new("anything")));
    }

    #[test]
    fn test_extension_pattern() {
        let filter = PatternFilter::new("*.txt").expect("valid pattern");
        assert!(filter.matches(Utf8Path::new("/tmp/watched/a.txt")));
        assert!(filter.matches(Utf8Path::new("/tmp/watched/deep/nested/b.txt")));
        assert!(!filter.matches(Utf8Path::new("/tmp/watched/a.bin")));
        assert!(!filter.matches(Utf8Path::new("/tmp/watched/txt")));
    }

    #[test]
    fn test_pattern_ignores_directory_part() {
        let filter = PatternFilter::new("report-?.csv").expect("valid pattern");
        assert!(filter.matches(Utf8Path::new("/data/csv-files/report-1.csv")));
        assert!(!filter.matches(Utf8Path::new("/data/report-1.csv/other.txt")));
    }

    #[test]
    fn test_alternation_and_classes() {
        let filter = PatternFilter::new("*.{log,txt}").expect("valid pattern");
        assert!(filter.matches(Utf8Path::new("a.log")));
        assert!(filter.matches(Utf8Path::new("a.txt")));
        assert!(!filter.matches(Utf8Path::new("a.md")));

        let filter = PatternFilter::new("file[0-9].dat").expect("valid pattern");
        assert!(filter.matches(Utf8Path::new("file7.dat")));
        assert!(!filter.matches(Utf8Path::new("fileA.dat")));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_case_sensitive_on_unix() {
        let filter = PatternFilter::new("*.txt").expect("valid pattern");
        assert!(!filter.matches(Utf8Path::new("NOTES.TXT")));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = PatternFilter::new("[unclosed");
        match result {
            Err(WatchError::InvalidFilter { pattern, .. }) => assert_eq!(pattern, "[unclosed"),
            other => panic!("Expected InvalidFilter, got {other:?}"),
        }
    }
}
