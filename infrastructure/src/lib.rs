//! Infrastructure layer for copilot-workbench
//!
//! This crate contains the adapters that implement the ports defined in the
//! application layer: the sandbox primitives (path resolution, checksums,
//! atomic writes, content guards) and the concrete tools built on them,
//! plus limits-config file loading.

pub mod config;
pub mod tools;
pub mod workspace;

// Re-export commonly used types
pub use config::{ConfigLoader, FileWorkbenchConfig};
pub use tools::{CommandRunner, DirectoryTools, FileTools};
pub use workspace::{ChecksumStore, ContentGuard, GitignoreRules, PathResolver};
