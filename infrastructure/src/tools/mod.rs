//! Concrete sandbox tools
//!
//! Adapters for the application-layer ports, composed from the workspace
//! primitives:
//!
//! | Tool | Port | Composes |
//! |------|------|----------|
//! | [`FileTools`] | `FileToolsPort` | resolver + guard + checksums + atomic writes |
//! | [`DirectoryTools`] | `DirectoryToolsPort` | resolver + ignore rules + external matcher |
//! | [`CommandRunner`] | `CommandRunnerPort` | resolver + bounded stream collectors |
//!
//! All three share one [`PathResolver`] and one set of
//! [`WorkspaceParams`](workbench_application::WorkspaceParams); `FileTools`
//! additionally holds the session's shared
//! [`ChecksumStore`](crate::workspace::ChecksumStore).

pub mod command;
pub mod dir;
pub mod file;

pub use command::CommandRunner;
pub use dir::DirectoryTools;
pub use file::FileTools;
