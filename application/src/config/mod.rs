//! Workspace limit parameters
//!
//! Static resource bounds consumed by every tool. These are application
//! concerns, not domain policy: the domain defines what an operation means,
//! these decide how much of it one session is allowed to do.

mod params;

pub use params::{CommandParams, ConfigValidationError, RuntimeParams, WorkspaceParams};
