//! Tool request entities
//!
//! One struct per sandbox operation. All are serde-derived so the external
//! dispatcher can map LLM tool-call JSON straight onto them; builder-style
//! `with_*` methods cover programmatic construction in tests and use cases.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read a file, optionally a byte range of it.
///
/// `offset == 0 && limit == 0` means the whole file. A read that spans the
/// entire file is the only kind that seeds the checksum cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadFileRequest {
    /// Workspace path of the file to read.
    pub path: String,
    /// Byte offset to start reading from.
    #[serde(default)]
    pub offset: u64,
    /// Maximum number of bytes to read (0 = to end of file).
    #[serde(default)]
    pub limit: u64,
}

impl ReadFileRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            limit: 0,
        }
    }

    pub fn with_range(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Whether this read spans the entire file.
    pub fn is_full_read(&self) -> bool {
        self.offset == 0 && self.limit == 0
    }
}

/// Create a new file. Never overwrites an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteFileRequest {
    /// Workspace path of the file to create.
    pub path: String,
    /// Content to write.
    pub content: String,
    /// Permission bits for the new file (e.g. `0o644`); default applied by
    /// the tool when absent.
    #[serde(default)]
    pub perm: Option<u32>,
}

impl WriteFileRequest {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            perm: None,
        }
    }

    pub fn with_perm(mut self, perm: u32) -> Self {
        self.perm = Some(perm);
        self
    }
}

/// A single replace-or-append step inside an [`EditFileRequest`].
///
/// `before == ""` appends `after` to the end of the current text. Otherwise
/// `before` is matched literally (no regex) and every occurrence is
/// replaced, with the occurrence count checked against
/// `expected_replacements` first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOperation {
    /// Literal snippet to replace; empty string means append.
    pub before: String,
    /// Replacement (or appended) text.
    pub after: String,
    /// Expected occurrence count of `before`. Unset or non-positive means 1.
    #[serde(default)]
    pub expected_replacements: Option<i64>,
}

impl EditOperation {
    pub fn replace(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
            expected_replacements: None,
        }
    }

    pub fn append(after: impl Into<String>) -> Self {
        Self {
            before: String::new(),
            after: after.into(),
            expected_replacements: None,
        }
    }

    pub fn with_expected_replacements(mut self, count: i64) -> Self {
        self.expected_replacements = Some(count);
        self
    }

    /// Whether this operation appends rather than replaces.
    pub fn is_append(&self) -> bool {
        self.before.is_empty()
    }

    /// The occurrence count this operation demands (default 1, also for
    /// explicit non-positive values).
    pub fn required_count(&self) -> u64 {
        match self.expected_replacements {
            Some(n) if n > 0 => n as u64,
            _ => 1,
        }
    }
}

/// Edit an existing file through a sequence of operations.
///
/// Operations apply in request order against an in-memory copy; operation N
/// observes the text as already mutated by operations 1..N-1. The file on
/// disk only changes if every operation succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFileRequest {
    /// Workspace path of the file to edit.
    pub path: String,
    /// Steps to apply, in order.
    pub operations: Vec<EditOperation>,
}

impl EditFileRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            operations: Vec::new(),
        }
    }

    pub fn with_operation(mut self, op: EditOperation) -> Self {
        self.operations.push(op);
        self
    }
}

/// List a directory tree, paginated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDirRequest {
    /// Workspace path of the directory to list.
    pub path: String,
    /// Recursion depth: -1 unlimited, 0 current level only, N levels deep.
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,
    /// Include entries matched by gitignore rules.
    #[serde(default)]
    pub include_ignored: bool,
    /// Pagination offset into the sorted result set.
    #[serde(default)]
    pub offset: usize,
    /// Page size (0 = configured default).
    #[serde(default)]
    pub limit: usize,
}

fn default_max_depth() -> i64 {
    -1
}

impl ListDirRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            max_depth: -1,
            include_ignored: false,
            offset: 0,
            limit: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: i64) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_include_ignored(mut self, include: bool) -> Self {
        self.include_ignored = include;
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Find files by glob pattern, paginated like [`ListDirRequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindFilesRequest {
    /// Glob pattern, passed to the external matcher as one literal argument.
    pub pattern: String,
    /// Workspace directory to search under (empty = root).
    #[serde(default)]
    pub search_path: String,
    /// Recursion depth: -1 unlimited, 0 current level only, N levels deep.
    #[serde(default = "default_max_depth")]
    pub max_depth: i64,
    /// Include entries matched by gitignore rules.
    #[serde(default)]
    pub include_ignored: bool,
    /// Pagination offset into the sorted result set.
    #[serde(default)]
    pub offset: usize,
    /// Page size (0 = configured default).
    #[serde(default)]
    pub limit: usize,
}

impl FindFilesRequest {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            search_path: String::new(),
            max_depth: -1,
            include_ignored: false,
            offset: 0,
            limit: 0,
        }
    }

    pub fn with_search_path(mut self, path: impl Into<String>) -> Self {
        self.search_path = path.into();
        self
    }

    pub fn with_max_depth(mut self, depth: i64) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_include_ignored(mut self, include: bool) -> Self {
        self.include_ignored = include;
        self
    }

    pub fn with_page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// Run an external command inside the workspace.
///
/// `argv` is exec-style — no shell is ever involved. The environment is
/// layered: process env, then `env_files` contents, then `env` overrides;
/// later layers win on key collision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCommandRequest {
    /// Program and arguments, argv[0] is the program.
    pub argv: Vec<String>,
    /// Working directory (workspace path, default = workspace root).
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Wall-clock timeout in seconds (default = configured timeout).
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Explicit environment overrides, the highest-priority layer.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// `.env`-style files to load, in order, between process env and `env`.
    #[serde(default)]
    pub env_files: Vec<String>,
}

impl RunCommandRequest {
    pub fn new(argv: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            working_dir: None,
            timeout_secs: None,
            env: HashMap::new(),
            env_files: Vec::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_env_file(mut self, path: impl Into<String>) -> Self {
        self.env_files.push(path.into());
        self
    }

    /// The program to execute, if any argv was given.
    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_request_full_read() {
        assert!(ReadFileRequest::new("a.txt").is_full_read());
        assert!(!ReadFileRequest::new("a.txt").with_range(0, 10).is_full_read());
        assert!(!ReadFileRequest::new("a.txt").with_range(5, 0).is_full_read());
    }

    #[test]
    fn test_edit_operation_required_count() {
        assert_eq!(EditOperation::replace("a", "b").required_count(), 1);
        assert_eq!(
            EditOperation::replace("a", "b")
                .with_expected_replacements(3)
                .required_count(),
            3
        );
        // Non-positive values fall back to the default of 1
        assert_eq!(
            EditOperation::replace("a", "b")
                .with_expected_replacements(0)
                .required_count(),
            1
        );
        assert_eq!(
            EditOperation::replace("a", "b")
                .with_expected_replacements(-2)
                .required_count(),
            1
        );
    }

    #[test]
    fn test_edit_operation_append() {
        let op = EditOperation::append("tail");
        assert!(op.is_append());
        assert_eq!(op.after, "tail");
    }

    #[test]
    fn test_list_request_defaults() {
        let req = ListDirRequest::new("src");
        assert_eq!(req.max_depth, -1);
        assert!(!req.include_ignored);
        assert_eq!((req.offset, req.limit), (0, 0));
    }

    #[test]
    fn test_list_request_deserializes_with_defaults() {
        let req: ListDirRequest = serde_json::from_str(r#"{"path": "src"}"#).unwrap();
        assert_eq!(req.max_depth, -1);
        assert_eq!(req.limit, 0);
    }

    #[test]
    fn test_run_command_request() {
        let req = RunCommandRequest::new(["echo", "hi"])
            .with_working_dir("sub")
            .with_timeout_secs(5)
            .with_env("KEY", "value");
        assert_eq!(req.program(), Some("echo"));
        assert_eq!(req.working_dir.as_deref(), Some("sub"));
        assert_eq!(req.env.get("KEY").map(String::as_str), Some("value"));
    }
}
