//! Ports — the seams between this core and its external collaborators.
//!
//! The agent dispatcher (out of scope here) holds these traits and nothing
//! else: it never sees a raw path, a child process, or a checksum. The
//! gitignore matcher is a port too, so List can be tested without real
//! `.gitignore` semantics.

pub mod command_runner;
pub mod directory_tools;
pub mod file_tools;
pub mod ignore_rules;

pub use command_runner::CommandRunnerPort;
pub use directory_tools::DirectoryToolsPort;
pub use file_tools::FileToolsPort;
pub use ignore_rules::IgnoreRulesPort;
