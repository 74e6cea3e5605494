//! Content guard — size limits and the binary heuristic.
//!
//! The binary check is the usual sampled NUL sniff: a file (or stream) is
//! treated as binary when a NUL byte appears in its first `sample_size`
//! bytes. Non-UTF-8 text without NULs passes and is decoded lossily by the
//! tools.

use workbench_domain::tool::error::{ToolError, ToolResult};

/// Size and binary-content checks shared by the file tools.
#[derive(Debug, Clone, Copy)]
pub struct ContentGuard {
    /// Largest file the tools will read or produce, in bytes.
    max_file_size: u64,
    /// How many leading bytes the binary sniff inspects.
    sample_size: usize,
}

impl ContentGuard {
    pub fn new(max_file_size: u64, sample_size: usize) -> Self {
        Self {
            max_file_size,
            sample_size,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Reject sizes over the configured limit.
    pub fn check_size(&self, path: &str, size: u64) -> ToolResult<()> {
        if size > self.max_file_size {
            Err(ToolError::TooLarge {
                path: path.to_string(),
                size,
                limit: self.max_file_size,
            })
        } else {
            Ok(())
        }
    }

    /// NUL byte within the sampled prefix?
    pub fn looks_binary(&self, bytes: &[u8]) -> bool {
        let sample = &bytes[..bytes.len().min(self.sample_size)];
        sample.contains(&0)
    }

    /// Reject content the sniff flags as binary.
    pub fn check_text(&self, path: &str, bytes: &[u8]) -> ToolResult<()> {
        if self.looks_binary(bytes) {
            Err(ToolError::BinaryContent {
                path: path.to_string(),
            })
        } else {
            Ok(())
        }
    }
}
