//! sw_message tool implementation.
//!
//! Posts a control message to the worker; the reply channel is the tool result.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use swcache_client::ServiceWorker;
use swcache_core::{ControlMessage, ControlReply};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_message.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// "CACHE_URLS", "CLEAR_CACHE" or "GET_CACHE_SIZE".
    #[serde(rename = "type")]
    pub kind: String,

    /// Message payload, e.g. `{"urls": ["/a.html"]}` for CACHE_URLS.
    #[serde(default)]
    pub payload: Option<Value>,
}

impl SwMessageParams {
    fn into_message(self) -> Result<ControlMessage, ToolError> {
        let mut raw = Map::new();
        raw.insert("type".into(), Value::String(self.kind.clone()));
        if let Some(payload) = self.payload {
            raw.insert("payload".into(), payload);
        }
        serde_json::from_value(Value::Object(raw))
            .map_err(|e| ToolError::InvalidInput(format!("invalid {} message: {e}", self.kind)))
    }
}

/// Output structure for sw_message.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    #[serde(rename = "type")]
    pub kind: String,
    /// Present only for messages that reply.
    pub reply: Option<ControlReply>,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &ServiceWorker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message = params.into_message()?;
    let kind = message.kind().to_string();
    let reply = worker.handle_message(message).await?;
    json_result(&SwMessageOutput { kind, reply })
}
