//! File mutation port
//!
//! Defines how the dispatcher reads and safely mutates workspace files.

use async_trait::async_trait;
use workbench_domain::tool::{
    entities::{EditFileRequest, ReadFileRequest, WriteFileRequest},
    error::ToolResult,
    value_objects::{EditFileResponse, ReadFileResponse, WriteFileResponse},
};

/// Port for file read/write/edit operations.
///
/// Implementations (adapters) live in the infrastructure layer and carry the
/// session's shared checksum store, so a Read through this port arms the
/// optimistic-concurrency check a later Edit relies on.
#[async_trait]
pub trait FileToolsPort: Send + Sync {
    /// Read a file or a byte range of it.
    async fn read_file(&self, request: &ReadFileRequest) -> ToolResult<ReadFileResponse>;

    /// Create a new file. Fails if the target already exists.
    async fn write_file(&self, request: &WriteFileRequest) -> ToolResult<WriteFileResponse>;

    /// Apply a sequence of replace/append operations to an existing file.
    async fn edit_file(&self, request: &EditFileRequest) -> ToolResult<EditFileResponse>;
}
