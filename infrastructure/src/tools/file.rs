//! File mutation tools: read, write, edit.
//!
//! The safe-mutation contract in one place:
//!
//! - **Read** hands content to the agent and, for full reads, records what
//!   it saw in the checksum store.
//! - **Write** only creates — an existing file is an error, never an
//!   overwrite.
//! - **Edit** mutates existing files through literal replace/append
//!   operations, guarded by the checksum recorded at Read time and written
//!   atomically with the original permission bits.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use workbench_application::config::WorkspaceParams;
use workbench_application::ports::file_tools::FileToolsPort;
use workbench_domain::tool::{
    entities::{EditFileRequest, EditOperation, ReadFileRequest, WriteFileRequest},
    error::{ToolError, ToolResult},
    value_objects::{EditFileResponse, ReadFileResponse, WriteFileResponse},
};
use workbench_domain::workspace::ResolvedPath;

use crate::workspace::atomic::{ensure_parent_dirs, write_atomic};
use crate::workspace::{ChecksumStore, ContentGuard, PathResolver};

/// Permission bits applied when a write request does not name any.
const DEFAULT_WRITE_PERM: u32 = 0o644;

/// Bytes and permission bits captured between Edit's read and its write,
/// used to re-verify that no external writer slipped in.
struct FileSnapshot {
    bytes: Vec<u8>,
    #[cfg(unix)]
    mode: u32,
}

impl FileSnapshot {
    fn capture(path: &Path, display: &str) -> ToolResult<Self> {
        let bytes =
            fs::read(path).map_err(|e| ToolError::io("read", display.to_string(), e))?;
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            fs::metadata(path)
                .map_err(|e| ToolError::io("stat", display.to_string(), e))?
                .permissions()
                .mode()
                & 0o7777
        };
        Ok(Self {
            bytes,
            #[cfg(unix)]
            mode,
        })
    }

    fn perm(&self) -> u32 {
        #[cfg(unix)]
        {
            self.mode
        }
        #[cfg(not(unix))]
        {
            DEFAULT_WRITE_PERM
        }
    }
}

/// Adapter implementing [`FileToolsPort`] against the real filesystem.
pub struct FileTools {
    resolver: PathResolver,
    guard: ContentGuard,
    checksums: Arc<ChecksumStore>,
}

impl FileTools {
    pub fn new(
        resolver: PathResolver,
        params: &WorkspaceParams,
        checksums: Arc<ChecksumStore>,
    ) -> Self {
        Self {
            resolver,
            guard: ContentGuard::new(params.max_file_size, params.binary_sample_size),
            checksums,
        }
    }

    /// Stat a resolved path that must be an existing regular file within the
    /// size limit.
    fn stat_existing_file(&self, resolved: &ResolvedPath) -> ToolResult<fs::Metadata> {
        let display = resolved.display_relative();
        let meta = match fs::metadata(resolved.as_path()) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::FileMissing {
                    path: display.to_string(),
                });
            }
            Err(e) => return Err(ToolError::io("stat", display.to_string(), e)),
        };
        if meta.is_dir() {
            return Err(ToolError::IsDirectory {
                path: display.to_string(),
            });
        }
        self.guard.check_size(display, meta.len())?;
        Ok(meta)
    }

    fn read_impl(&self, request: &ReadFileRequest) -> ToolResult<ReadFileResponse> {
        let resolved = self.resolver.resolve(&request.path)?;
        let display = resolved.display_relative().to_string();

        let meta = self.stat_existing_file(&resolved)?;
        let bytes = fs::read(resolved.as_path())
            .map_err(|e| ToolError::io("read", display.clone(), e))?;
        self.guard.check_text(&display, &bytes)?;

        let len = bytes.len();
        let start = (request.offset as usize).min(len);
        let end = if request.limit == 0 {
            len
        } else {
            start.saturating_add(request.limit as usize).min(len)
        };
        let content = String::from_utf8_lossy(&bytes[start..end]).into_owned();

        // Only a full-span read arms the optimistic-concurrency check;
        // partial reads never touch the cache.
        if request.is_full_read() {
            self.checksums
                .update(resolved.as_path(), ChecksumStore::compute(&bytes));
        }

        Ok(ReadFileResponse {
            content,
            size: meta.len(),
            truncated: !(start == 0 && end == len),
        })
    }

    fn write_impl(&self, request: &WriteFileRequest) -> ToolResult<WriteFileResponse> {
        let resolved = self.resolver.resolve(&request.path)?;
        let display_path = resolved.display_relative().to_string();

        // symlink_metadata so even a dangling link at the target counts as
        // "exists" — Write never overwrites anything.
        match fs::symlink_metadata(resolved.as_path()) {
            Ok(_) => {
                return Err(ToolError::FileAlreadyExists { path: display_path });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ToolError::io("stat", display_path, e)),
        }

        let bytes = request.content.as_bytes();
        self.guard.check_size(&display_path, bytes.len() as u64)?;
        self.guard.check_text(&display_path, bytes)?;

        ensure_parent_dirs(resolved.as_path())?;
        let perm = request.perm.unwrap_or(DEFAULT_WRITE_PERM);
        write_atomic(resolved.as_path(), bytes, perm)?;

        self.checksums
            .update(resolved.as_path(), ChecksumStore::compute(bytes));
        debug!(path = %display_path, bytes = bytes.len(), "file created");

        Ok(WriteFileResponse {
            bytes_written: bytes.len(),
            perm,
        })
    }

    fn edit_impl(&self, request: &EditFileRequest) -> ToolResult<EditFileResponse> {
        let resolved = self.resolver.resolve(&request.path)?;
        let display_path = resolved.display_relative().to_string();

        self.stat_existing_file(&resolved)?;
        let snapshot = FileSnapshot::capture(resolved.as_path(), &display_path)?;
        self.guard.check_text(&display_path, &snapshot.bytes)?;

        // Optimistic concurrency: if a prior Read cached a hash and the file
        // no longer matches it, someone else wrote in between.
        let current_hash = ChecksumStore::compute(&snapshot.bytes);
        let cached_hash = self.checksums.get(resolved.as_path());
        if let Some(cached) = &cached_hash
            && *cached != current_hash
        {
            return Err(ToolError::EditConflict { path: display_path });
        }

        let mut text = String::from_utf8_lossy(&snapshot.bytes).into_owned();
        let mut applied = 0usize;
        for op in &request.operations {
            text = apply_operation(&display_path, text, op)?;
            applied += 1;
        }

        self.guard.check_size(&display_path, text.len() as u64)?;

        // Narrow (not eliminate) the read-to-write race: re-verify the file
        // on disk still matches what this edit was computed against.
        if cached_hash.is_some() {
            let bytes_now = fs::read(resolved.as_path())
                .map_err(|e| ToolError::io("read", display_path.clone(), e))?;
            if ChecksumStore::compute(&bytes_now) != current_hash {
                return Err(ToolError::EditConflict { path: display_path });
            }
        }

        write_atomic(resolved.as_path(), text.as_bytes(), snapshot.perm())?;
        self.checksums
            .update(resolved.as_path(), ChecksumStore::compute(text.as_bytes()));
        debug!(path = %display_path, operations = applied, "file edited");

        Ok(EditFileResponse {
            operations_applied: applied,
            file_size: text.len(),
        })
    }
}

/// Apply one replace/append operation to the in-memory text.
fn apply_operation(path: &str, text: String, op: &EditOperation) -> ToolResult<String> {
    if op.is_append() {
        // There is exactly one append location, so an explicit count must
        // name it.
        if let Some(expected) = op.expected_replacements
            && expected != 1
        {
            return Err(ToolError::ReplacementCountMismatch {
                path: path.to_string(),
                expected: expected.max(0) as u64,
                actual: 1,
            });
        }
        let mut text = text;
        text.push_str(&op.after);
        return Ok(text);
    }

    let actual = text.matches(&op.before).count() as u64;
    if actual == 0 {
        return Err(ToolError::snippet_not_found(path, &op.before));
    }
    let expected = op.required_count();
    if actual != expected {
        return Err(ToolError::ReplacementCountMismatch {
            path: path.to_string(),
            expected,
            actual,
        });
    }
    Ok(text.replace(&op.before, &op.after))
}

#[async_trait]
impl FileToolsPort for FileTools {
    async fn read_file(&self, request: &ReadFileRequest) -> ToolResult<ReadFileResponse> {
        self.read_impl(request)
    }

    async fn write_file(&self, request: &WriteFileRequest) -> ToolResult<WriteFileResponse> {
        self.write_impl(request)
    }

    async fn edit_file(&self, request: &EditFileRequest) -> ToolResult<EditFileResponse> {
        self.edit_impl(request)
    }
}
