//! Structured errors raised by the tool layer itself.
//!
//! Engine failures arrive as `swcache_core::Error` and convert on their own.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Tool arguments that do not form a valid event (e.g. an unknown message type).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
