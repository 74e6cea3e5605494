//! Application layer for copilot-workbench
//!
//! This crate defines the ports the agent dispatcher consumes and the
//! validated limit parameters every tool is constructed with. Adapters live
//! in the infrastructure layer.

pub mod config;
pub mod ports;

// Re-export commonly used types
pub use config::{CommandParams, ConfigValidationError, RuntimeParams, WorkspaceParams};
pub use ports::{
    command_runner::CommandRunnerPort,
    directory_tools::DirectoryToolsPort,
    file_tools::FileToolsPort,
    ignore_rules::{IgnoreRulesPort, NoIgnoreRules},
};
