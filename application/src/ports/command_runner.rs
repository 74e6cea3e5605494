//! Command execution port

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use workbench_domain::tool::{
    entities::RunCommandRequest, error::ToolResult, value_objects::RunCommandResponse,
};

/// Port for supervised command execution.
///
/// A resolved run always reports the child's own exit code — a failing build
/// is a successful invocation. Cancellation terminates the child (never
/// orphans it) and surfaces as `ToolError::Cancelled`.
#[async_trait]
pub trait CommandRunnerPort: Send + Sync {
    async fn run_command(
        &self,
        request: &RunCommandRequest,
        cancel: &CancellationToken,
    ) -> ToolResult<RunCommandResponse>;
}
