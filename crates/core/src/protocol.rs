//! Control messages sent from a page to the worker.
//!
//! Wire shape: `{ "type": "CACHE_URLS" | "CLEAR_CACHE" | "GET_CACHE_SIZE", "payload": { ... } }`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A control command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Best-effort add of the listed URLs to the current bucket. No reply.
    CacheUrls {
        #[serde(default)]
        urls: Vec<String>,
    },
    /// Delete every bucket. No reply.
    ClearCache,
    /// Reply with the byte size of the current bucket.
    GetCacheSize,
}

impl ControlMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::CacheUrls { .. } => "CACHE_URLS",
            ControlMessage::ClearCache => "CLEAR_CACHE",
            ControlMessage::GetCacheSize => "GET_CACHE_SIZE",
        }
    }
}

/// Message posted back on the reply channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ControlReply {
    CacheSize { size: u64 },
}
