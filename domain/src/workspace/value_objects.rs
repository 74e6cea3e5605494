//! Workspace value objects — boundary-checked path pairs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A path that has passed the workspace boundary check.
///
/// Produced exclusively by the infrastructure path resolver; tools accept a
/// `ResolvedPath` instead of a raw string so that "was this checked?" is a
/// type-level question, not a convention.
///
/// Invariants (upheld by the resolver, relied on by every tool):
///
/// - `absolute` is the workspace root itself or a descendant of it.
/// - `relative` is slash-normalized, and empty for the root (never `"."`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    /// Cleaned absolute path on the host filesystem.
    pub absolute: PathBuf,
    /// Path relative to the workspace root, `/`-separated.
    pub relative: String,
}

impl ResolvedPath {
    pub fn new(absolute: impl Into<PathBuf>, relative: impl Into<String>) -> Self {
        Self {
            absolute: absolute.into(),
            relative: relative.into(),
        }
    }

    /// Whether this resolves to the workspace root itself.
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Relative path for display, `"."` when the root itself is meant.
    ///
    /// The stored `relative` stays empty for the root; this is only a
    /// rendering concern for user-facing messages.
    pub fn display_relative(&self) -> &str {
        if self.relative.is_empty() {
            "."
        } else {
            &self.relative
        }
    }
}

impl std::fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.absolute.display())
    }
}
