//! sw_fetch tool implementation.
//!
//! Delivers a fetch event to the worker and reports how it was answered.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::ServiceWorker;
use swcache_core::{Request, ResourceClass, Response};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_fetch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: "GET"). Anything else bypasses the worker.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// False when the request was passed straight to the network.
    pub intercepted: bool,
    pub class: Option<ResourceClass>,
    /// Strategy used: "cache_first", "network_first" or "stale_while_revalidate".
    pub policy: Option<String>,
    /// "cache", "network", "offline_page" or "synthesized".
    pub source: String,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    /// Body as UTF-8 text; absent for binary bodies.
    pub body: Option<String>,
    pub body_bytes: usize,
}

impl SwFetchOutput {
    fn new(url: String, response: Response) -> Self {
        let body = response.body_text().map(str::to_string);
        Self {
            url,
            intercepted: false,
            class: None,
            policy: None,
            source: "network".into(),
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body,
            body_bytes: response.body.len(),
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let method = params.method.trim();
    if method.is_empty() {
        return Err(ToolError::InvalidInput("method cannot be empty".into()).into());
    }

    let url = worker.resolve(&params.url)?;
    let request = Request::new(method, url);

    let output = match worker.handle_fetch(&request).await? {
        Some(served) => SwFetchOutput {
            intercepted: true,
            class: Some(served.class),
            policy: Some(served.policy.name().to_string()),
            source: served.source.as_str().to_string(),
            ..SwFetchOutput::new(request.url.to_string(), served.response)
        },
        None => SwFetchOutput::new(request.url.to_string(), worker.passthrough(&request).await?),
    };

    tracing::debug!(url = %output.url, source = %output.source, status = output.status, "sw_fetch answered");
    json_result(&output)
}
