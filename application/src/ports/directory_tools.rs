//! Directory listing and search port

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use workbench_domain::tool::{
    entities::{FindFilesRequest, ListDirRequest},
    error::ToolResult,
    value_objects::{FindFilesResponse, ListDirResponse},
};

/// Port for directory enumeration.
///
/// Both operations take a [`CancellationToken`]: tree walks over large or
/// adversarial workspaces must stop promptly when the agent turn is aborted,
/// surfacing `ToolError::Cancelled` rather than a partial result.
#[async_trait]
pub trait DirectoryToolsPort: Send + Sync {
    /// Depth-first, cycle-safe, paginated listing of a directory tree.
    async fn list_dir(
        &self,
        request: &ListDirRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<ListDirResponse>;

    /// Glob search over the workspace, paginated like `list_dir`.
    async fn find_files(
        &self,
        request: &FindFilesRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<FindFilesResponse>;
}
