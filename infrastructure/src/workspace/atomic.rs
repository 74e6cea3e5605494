//! Atomic file writes.
//!
//! A write is never observable half-applied: content goes to a temp file in
//! the *same directory* as the target (same filesystem, so the final rename
//! is atomic), is flushed to stable storage, gets its permission bits, and
//! only then is renamed over the target. Any failure before the rename
//! leaves the target untouched; `NamedTempFile` removes the temp on drop.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use workbench_domain::tool::error::{ToolError, ToolResult};

/// Write `bytes` to `path` atomically with the given permission bits.
pub fn write_atomic(path: &Path, bytes: &[u8], perm: u32) -> ToolResult<()> {
    let parent = path.parent().ok_or_else(|| {
        ToolError::InvalidArgument(format!("path has no parent directory: {}", path.display()))
    })?;

    let mut tmp = NamedTempFile::new_in(parent)
        .map_err(|e| ToolError::io("create temp file", path.display().to_string(), e))?;

    tmp.write_all(bytes)
        .map_err(|e| ToolError::io("write", path.display().to_string(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ToolError::io("fsync", path.display().to_string(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(perm))
            .map_err(|e| ToolError::io("chmod", path.display().to_string(), e))?;
    }
    #[cfg(not(unix))]
    let _ = perm;

    tmp.persist(path)
        .map_err(|e| ToolError::io("rename", path.display().to_string(), e.error))?;
    Ok(())
}

/// Recursively create the missing parent directories of `path`.
pub fn ensure_parent_dirs(path: &Path) -> ToolResult<()> {
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .map_err(|e| ToolError::io("create directories", parent.display().to_string(), e))?;
    }
    Ok(())
}
