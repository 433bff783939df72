//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::ServiceWorker;

use super::json_result;

/// Snapshot of the worker and its buckets.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    /// Name of the current bucket.
    pub cache_version: String,
    /// Lifecycle state, e.g. "activated".
    pub state: String,
    /// All buckets present in the store.
    pub buckets: Vec<String>,
    /// URLs stored in the current bucket.
    pub entries: Vec<String>,
    /// Sum of body lengths in the current bucket.
    pub cache_size: u64,
    /// Background revalidations still running.
    pub pending_background: usize,
}

pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let store = worker.store();
    let output = SwStatusOutput {
        cache_version: worker.cache_name().to_string(),
        state: worker.state().await.as_str().to_string(),
        buckets: store.bucket_names().await?,
        entries: store.entry_urls(worker.cache_name()).await?,
        cache_size: worker.cache_size().await?,
        pending_background: worker.pending_background().await,
    };
    json_result(&output)
}
