//! Tool response value objects
//!
//! These types form the **output side** of the sandbox tool pipeline. Every
//! success is a typed response; every field the dispatcher needs to render a
//! result message is present (sizes, truncation flags, exit codes), so no
//! tool ever needs a second call to describe what happened.

use serde::{Deserialize, Serialize};

/// Result of a Read operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadFileResponse {
    /// Decoded file content (the requested range).
    pub content: String,
    /// Total size of the file on disk, in bytes.
    pub size: u64,
    /// Whether the returned range is shorter than the whole file.
    pub truncated: bool,
}

/// Result of a Write operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFileResponse {
    /// Number of bytes written.
    pub bytes_written: usize,
    /// Permission bits the file was created with.
    pub perm: u32,
}

/// Result of an Edit operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFileResponse {
    /// How many operations were applied (always the full request count on
    /// success — edits are all-or-nothing).
    pub operations_applied: usize,
    /// File size in bytes after the edit.
    pub file_size: usize,
}

/// One entry produced by List or Find.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Path relative to the workspace root, `/`-separated.
    pub relative_path: String,
    /// Whether the entry is a directory (symlinks to directories count).
    pub is_dir: bool,
}

impl DirectoryEntry {
    pub fn new(relative_path: impl Into<String>, is_dir: bool) -> Self {
        Self {
            relative_path: relative_path.into(),
            is_dir,
        }
    }
}

/// Why a List result set is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationReason {
    /// The walk stopped collecting at the global result cap.
    ResultCap,
    /// The full set was collected but the requested page ends before it.
    Pagination,
}

/// Result of a List operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDirResponse {
    /// The requested page of the sorted result set.
    pub entries: Vec<DirectoryEntry>,
    /// Total number of collected entries (pre-pagination).
    pub total_count: usize,
    /// Whether `entries` is incomplete relative to the tree.
    pub truncated: bool,
    /// Cause of the truncation, when `truncated` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncation_reason: Option<TruncationReason>,
}

/// Result of a Find operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindFilesResponse {
    /// Workspace-relative slash paths, sorted lexicographically.
    pub matches: Vec<String>,
    /// Total number of collected matches (pre-pagination).
    pub total_count: usize,
    /// Whether `matches` is incomplete (cap hit or page ended early).
    pub truncated: bool,
}

/// Terminal state of a command execution.
///
/// `Cancelled` exists for the engine's internal completion race; at the port
/// boundary a cancelled run surfaces as
/// [`ToolError::Cancelled`](super::ToolError::Cancelled) so callers can tell
/// infrastructure aborts from tool results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandDisposition {
    /// The child exited on its own.
    Completed,
    /// The wall-clock deadline fired; the child was terminated.
    TimedOut,
    /// The caller's cancellation token fired; the child was terminated.
    Cancelled,
}

/// Result of a RunCommand operation.
///
/// A non-zero `exit_code` is a *successful* invocation carrying the child's
/// result — the agent decides what a failing build means. `-1` stands in for
/// "no real exit code": timeout or death by signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCommandResponse {
    /// Collected stdout, or a binary placeholder.
    pub stdout: String,
    /// Collected stderr, or a binary placeholder.
    pub stderr: String,
    /// The child's exit code; `-1` for timeout/signal.
    pub exit_code: i32,
    /// Whether either stream hit its byte cap.
    pub truncated: bool,
    /// How the execution ended.
    pub disposition: CommandDisposition,
}

impl RunCommandResponse {
    /// Whether the child ran to completion with exit code zero.
    pub fn is_success(&self) -> bool {
        self.disposition == CommandDisposition::Completed && self.exit_code == 0
    }

    /// Whether the deadline killed the child.
    pub fn timed_out(&self) -> bool {
        self.disposition == CommandDisposition::TimedOut
    }
}
