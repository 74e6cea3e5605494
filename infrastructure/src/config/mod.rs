//! Limits-config loading
//!
//! Raw TOML structures mirroring the `workbench.toml` file, and the loader
//! that merges file sources onto built-in defaults and hands back validated
//! [`WorkspaceParams`](workbench_application::WorkspaceParams).

mod file_config;
mod loader;

pub use file_config::{
    FileCommandConfig, FileLimitsConfig, FileRuntimeConfig, FileWorkbenchConfig,
};
pub use loader::{ConfigError, ConfigLoader};
