//! Tool domain module
//!
//! This module defines the request/response contract of the sandbox tools —
//! how the agent's dispatcher (external to this workspace) asks for file
//! reads, safe mutations, directory listings, searches, and command runs.
//!
//! # Overview
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐    ┌──────────────────┐
//! │ *Request          │───▶│ tool (infra)     │───▶│ *Response        │
//! │ (typed, serde)    │    │ resolver+guards  │    │ or ToolError     │
//! └──────────────────┘    └──────────────────┘    └──────────────────┘
//! ```
//!
//! Every operation is a typed request struct in [`entities`] and produces a
//! typed response from [`value_objects`] or a tagged [`ToolError`] variant.
//! There is deliberately no stringly-typed call shape here: the dispatcher
//! owns JSON-schema translation, this layer owns meaning.
//!
//! # Expected failures vs. aborts
//!
//! Edit conflicts, missing snippets, and replacement-count mismatches are
//! *normal* outcomes of optimistic concurrency — the agent reacts to them
//! in-turn. Cancellation and unrecoverable I/O abort the enclosing turn.
//! [`ToolError::is_fatal`] is the dividing line.

pub mod entities;
pub mod error;
pub mod value_objects;

pub use entities::{
    EditFileRequest, EditOperation, FindFilesRequest, ListDirRequest, ReadFileRequest,
    RunCommandRequest, WriteFileRequest,
};
pub use error::{ToolError, ToolResult};
pub use value_objects::{
    CommandDisposition, DirectoryEntry, EditFileResponse, FindFilesResponse, ListDirResponse,
    ReadFileResponse, RunCommandResponse, TruncationReason, WriteFileResponse,
};
