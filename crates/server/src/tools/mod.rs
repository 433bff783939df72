//! MCP tool implementations.
//!
//! Each tool stands in for one event the browser would deliver to the worker.

pub mod fetch;
pub mod message;
pub mod notify;
pub mod status;

pub use fetch::{SwFetchParams, fetch_impl};
pub use message::{SwMessageParams, message_impl};
pub use notify::{
    SwNotificationClickParams, SwPushParams, SwSyncParams, notification_click_impl, push_impl, sync_impl,
};
pub use status::status_impl;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Wrap a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
