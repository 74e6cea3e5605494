//! Tool error taxonomy
//!
//! One tagged enum for every way a sandbox operation can fail. The
//! dispatcher matches on variants — there is no error-code string table and
//! no downcasting. Three bands:
//!
//! | Band | Variants | Caller reaction |
//! |------|----------|-----------------|
//! | Input validation | `InvalidArgument` | fix the call, before any I/O |
//! | Boundary | `OutsideWorkspace`, `SymlinkLoop`, `SymlinkChainTooLong`, `WorkspaceRootNotSet` | rejected during resolution |
//! | Resource / domain | `FileMissing`, `FileAlreadyExists`, `EditConflict`, ... | expected, handled in-turn |
//!
//! Cancellation and wrapped I/O failures are the only *fatal* errors — they
//! abort the enclosing agent turn instead of being reported back to the
//! model. See [`ToolError::is_fatal`].

use thiserror::Error;

/// Result alias used by every tool operation.
pub type ToolResult<T> = Result<T, ToolError>;

/// Error produced by a sandbox tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// No workspace root was configured before resolving a path.
    #[error("workspace root has not been set")]
    WorkspaceRootNotSet,

    /// The path (or a symlink hop along it) leaves the workspace.
    #[error("path escapes the workspace: {path}")]
    OutsideWorkspace { path: String },

    /// A symlink chain revisited a path it already passed through.
    #[error("symlink loop detected at {path}")]
    SymlinkLoop { path: String },

    /// A symlink chain exceeded the configured hop budget.
    #[error("symlink chain longer than {max_hops} hops at {path}")]
    SymlinkChainTooLong { path: String, max_hops: usize },

    #[error("file not found: {path}")]
    FileMissing { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("is a directory: {path}")]
    IsDirectory { path: String },

    /// Write refuses to clobber; Edit is the mutation path for existing files.
    #[error("file already exists: {path}")]
    FileAlreadyExists { path: String },

    #[error("binary content detected in {path}")]
    BinaryContent { path: String },

    #[error("{path} is {size} bytes, limit is {limit}")]
    TooLarge { path: String, size: u64, limit: u64 },

    /// The file changed on disk between the cached Read and this Edit.
    #[error("edit conflict: {path} was modified since it was last read")]
    EditConflict { path: String },

    /// An edit operation's `before` snippet matched nothing.
    #[error("snippet not found in {path}: {snippet:?}")]
    SnippetNotFound { path: String, snippet: String },

    /// Occurrence count differed from the operation's expectation.
    #[error("expected {expected} replacement(s) in {path}, found {actual}")]
    ReplacementCountMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    /// Request rejected before any I/O (negative range, empty pattern,
    /// page size over the configured maximum, empty argv, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Container runtime readiness polling exhausted its attempts.
    #[error("container runtime {runtime} not ready after {attempts} attempts")]
    RuntimeNotReady { runtime: String, attempts: u32 },

    /// The caller's cancellation token fired. Infrastructure abort.
    #[error("operation cancelled")]
    Cancelled,

    /// Wrapped filesystem failure. Infrastructure abort.
    #[error("{op} failed for {path}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The command program could not be started. Infrastructure abort.
    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Wrap an I/O failure with the operation name and the path it hit.
    pub fn io(op: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Build a `SnippetNotFound`, clipping long snippets for display.
    pub fn snippet_not_found(path: impl Into<String>, snippet: &str) -> Self {
        const MAX_SNIPPET: usize = 120;
        let mut snippet = snippet.to_string();
        if snippet.len() > MAX_SNIPPET {
            let mut cut = MAX_SNIPPET;
            while !snippet.is_char_boundary(cut) {
                cut -= 1;
            }
            snippet.truncate(cut);
            snippet.push('…');
        }
        Self::SnippetNotFound {
            path: path.into(),
            snippet,
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ToolError::Cancelled)
    }

    /// Whether this error should abort the enclosing agent turn.
    ///
    /// Everything else is an expected tool outcome the dispatcher reports
    /// back to the model as a normal failed result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ToolError::Cancelled | ToolError::Io { .. } | ToolError::Spawn { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_fatal() {
        assert!(ToolError::Cancelled.is_fatal());
        assert!(ToolError::Cancelled.is_cancellation());
    }

    #[test]
    fn test_domain_outcomes_are_not_fatal() {
        let conflict = ToolError::EditConflict {
            path: "src/main.rs".into(),
        };
        assert!(!conflict.is_fatal());
        assert!(!conflict.is_cancellation());

        let outside = ToolError::OutsideWorkspace {
            path: "/etc/passwd".into(),
        };
        assert!(!outside.is_fatal());
    }

    #[test]
    fn test_io_is_fatal_and_keeps_cause() {
        let err = ToolError::io(
            "stat",
            "a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_fatal());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_snippet_not_found_clips_long_snippets() {
        let long = "x".repeat(500);
        let err = ToolError::snippet_not_found("a.txt", &long);
        match err {
            ToolError::SnippetNotFound { snippet, .. } => {
                assert!(snippet.chars().count() <= 121);
                assert!(snippet.ends_with('…'));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_display_carries_context() {
        let err = ToolError::TooLarge {
            path: "big.bin".into(),
            size: 20,
            limit: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("big.bin"));
        assert!(msg.contains("20"));
        assert!(msg.contains("10"));
    }
}
