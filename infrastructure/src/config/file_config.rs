//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the `workbench.toml`
//! file. Durations are plain seconds in the file; conversion to
//! [`WorkspaceParams`] happens in one place, [`FileWorkbenchConfig::into_params`].

use serde::{Deserialize, Serialize};
use std::time::Duration;
use workbench_application::config::{CommandParams, RuntimeParams, WorkspaceParams};

/// Complete file configuration (raw TOML structure).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkbenchConfig {
    /// File and traversal limits.
    pub limits: FileLimitsConfig,
    /// Command execution settings.
    pub command: FileCommandConfig,
    /// Container-runtime readiness settings.
    pub runtime: FileRuntimeConfig,
}

/// `[limits]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLimitsConfig {
    pub max_file_size: u64,
    pub binary_sample_size: usize,
    pub max_symlink_hops: usize,
    pub list_result_cap: usize,
    pub find_result_cap: usize,
    pub page_size_default: usize,
    pub page_size_max: usize,
}

impl Default for FileLimitsConfig {
    fn default() -> Self {
        let params = WorkspaceParams::default();
        Self {
            max_file_size: params.max_file_size,
            binary_sample_size: params.binary_sample_size,
            max_symlink_hops: params.max_symlink_hops,
            list_result_cap: params.list_result_cap,
            find_result_cap: params.find_result_cap,
            page_size_default: params.page_size_default,
            page_size_max: params.page_size_max,
        }
    }
}

/// `[command]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCommandConfig {
    pub max_output_bytes: usize,
    pub default_timeout_secs: u64,
    pub graceful_shutdown_secs: u64,
}

impl Default for FileCommandConfig {
    fn default() -> Self {
        let params = CommandParams::default();
        Self {
            max_output_bytes: params.max_output_bytes,
            default_timeout_secs: params.default_timeout.as_secs(),
            graceful_shutdown_secs: params.graceful_shutdown.as_secs(),
        }
    }
}

/// `[runtime]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRuntimeConfig {
    pub readiness_attempts: u32,
    pub readiness_interval_secs: u64,
    pub start_argv: Vec<String>,
}

impl Default for FileRuntimeConfig {
    fn default() -> Self {
        let params = RuntimeParams::default();
        Self {
            readiness_attempts: params.readiness_attempts,
            readiness_interval_secs: params.readiness_interval.as_secs(),
            start_argv: params.start_argv,
        }
    }
}

impl FileWorkbenchConfig {
    /// Map the raw file structure onto runtime parameters.
    pub fn into_params(self) -> WorkspaceParams {
        WorkspaceParams {
            max_file_size: self.limits.max_file_size,
            binary_sample_size: self.limits.binary_sample_size,
            max_symlink_hops: self.limits.max_symlink_hops,
            list_result_cap: self.limits.list_result_cap,
            find_result_cap: self.limits.find_result_cap,
            page_size_default: self.limits.page_size_default,
            page_size_max: self.limits.page_size_max,
            command: CommandParams {
                max_output_bytes: self.command.max_output_bytes,
                default_timeout: Duration::from_secs(self.command.default_timeout_secs),
                graceful_shutdown: Duration::from_secs(self.command.graceful_shutdown_secs),
            },
            runtime: RuntimeParams {
                readiness_attempts: self.runtime.readiness_attempts,
                readiness_interval: Duration::from_secs(self.runtime.readiness_interval_secs),
                start_argv: self.runtime.start_argv,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_config_matches_default_params() {
        let params = FileWorkbenchConfig::default().into_params();
        let defaults = WorkspaceParams::default();
        assert_eq!(params.max_file_size, defaults.max_file_size);
        assert_eq!(params.page_size_max, defaults.page_size_max);
        assert_eq!(params.command.default_timeout, defaults.command.default_timeout);
        assert_eq!(
            params.runtime.readiness_attempts,
            defaults.runtime.readiness_attempts
        );
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: FileWorkbenchConfig = toml::from_str(
            r#"
            [limits]
            max_file_size = 1024

            [command]
            default_timeout_secs = 5
            "#,
        )
        .unwrap();
        let params = config.into_params();
        assert_eq!(params.max_file_size, 1024);
        assert_eq!(params.command.default_timeout, Duration::from_secs(5));
        // Untouched fields keep their defaults
        assert_eq!(params.page_size_default, WorkspaceParams::default().page_size_default);
    }
}
