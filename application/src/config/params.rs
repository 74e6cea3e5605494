//! Resource-bound parameters for the sandbox tools.
//!
//! [`WorkspaceParams`] groups every configurable limit the tools enforce:
//! file sizes, command output caps, result caps, pagination, symlink hop
//! budgets, and the container-runtime readiness loop. All values are
//! validated once, at construction time, so the tools can trust them.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Invalid limit configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },

    #[error("page_size_default ({default}) exceeds page_size_max ({max})")]
    PageSizeOverMax { default: usize, max: usize },
}

/// Limits for a single command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandParams {
    /// Per-stream output cap in bytes; overflow is dropped silently.
    pub max_output_bytes: usize,
    /// Wall-clock timeout applied when a request does not name one.
    pub default_timeout: Duration,
    /// How long a terminated child gets to exit voluntarily before the
    /// force-kill.
    pub graceful_shutdown: Duration,
}

impl Default for CommandParams {
    fn default() -> Self {
        Self {
            max_output_bytes: 1024 * 1024,
            default_timeout: Duration::from_secs(60),
            graceful_shutdown: Duration::from_secs(5),
        }
    }
}

/// Readiness-poll settings for container-runtime commands (docker, podman).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeParams {
    /// Maximum `<runtime> info` probes before giving up.
    pub readiness_attempts: u32,
    /// Fixed delay between probes.
    pub readiness_interval: Duration,
    /// One-shot start command fired after the first failed probe
    /// (host-specific, e.g. `["podman", "machine", "start"]`); empty means
    /// poll only.
    pub start_argv: Vec<String>,
}

impl Default for RuntimeParams {
    fn default() -> Self {
        Self {
            readiness_attempts: 5,
            readiness_interval: Duration::from_secs(2),
            start_argv: Vec::new(),
        }
    }
}

/// Every resource bound the sandbox tools enforce.
///
/// Constructed once per session and shared (cheaply cloned) into each tool.
///
/// # Validation
///
/// [`validate()`](Self::validate) must pass before the params reach a tool;
/// the infrastructure config loader calls it after merging files, and tests
/// construct known-good values through the builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceParams {
    /// Largest file Read/Write/Edit will touch, in bytes.
    pub max_file_size: u64,
    /// How many leading bytes are sampled for the NUL-byte binary check.
    pub binary_sample_size: usize,
    /// Symlink hop budget per path resolution.
    pub max_symlink_hops: usize,
    /// Global cap on entries collected by one List walk.
    pub list_result_cap: usize,
    /// Global cap on matches collected by one Find call.
    pub find_result_cap: usize,
    /// Page size applied when a request passes `limit = 0`.
    pub page_size_default: usize,
    /// Largest page size a request may ask for.
    pub page_size_max: usize,
    /// Command execution limits.
    pub command: CommandParams,
    /// Container-runtime readiness settings.
    pub runtime: RuntimeParams,
}

impl Default for WorkspaceParams {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
            binary_sample_size: 8192,
            max_symlink_hops: 64,
            list_result_cap: 10_000,
            find_result_cap: 10_000,
            page_size_default: 500,
            page_size_max: 2000,
            command: CommandParams::default(),
            runtime: RuntimeParams::default(),
        }
    }
}

impl WorkspaceParams {
    // ==================== Builder Methods ====================

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_binary_sample_size(mut self, bytes: usize) -> Self {
        self.binary_sample_size = bytes;
        self
    }

    pub fn with_max_symlink_hops(mut self, hops: usize) -> Self {
        self.max_symlink_hops = hops;
        self
    }

    pub fn with_result_caps(mut self, list: usize, find: usize) -> Self {
        self.list_result_cap = list;
        self.find_result_cap = find;
        self
    }

    pub fn with_page_sizes(mut self, default: usize, max: usize) -> Self {
        self.page_size_default = default;
        self.page_size_max = max;
        self
    }

    pub fn with_command(mut self, command: CommandParams) -> Self {
        self.command = command;
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeParams) -> Self {
        self.runtime = runtime;
        self
    }

    // ==================== Validation ====================

    /// Reject zero or inconsistent limits before any tool sees them.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        fn positive(value: u128, field: &'static str) -> Result<(), ConfigValidationError> {
            if value == 0 {
                Err(ConfigValidationError::NotPositive { field })
            } else {
                Ok(())
            }
        }

        positive(self.max_file_size as u128, "max_file_size")?;
        positive(self.binary_sample_size as u128, "binary_sample_size")?;
        positive(self.max_symlink_hops as u128, "max_symlink_hops")?;
        positive(self.list_result_cap as u128, "list_result_cap")?;
        positive(self.find_result_cap as u128, "find_result_cap")?;
        positive(self.page_size_default as u128, "page_size_default")?;
        positive(self.page_size_max as u128, "page_size_max")?;
        positive(self.command.max_output_bytes as u128, "max_output_bytes")?;
        positive(
            self.command.default_timeout.as_millis(),
            "default_timeout",
        )?;
        positive(self.runtime.readiness_attempts as u128, "readiness_attempts")?;

        if self.page_size_default > self.page_size_max {
            return Err(ConfigValidationError::PageSizeOverMax {
                default: self.page_size_default,
                max: self.page_size_max,
            });
        }

        Ok(())
    }
}
