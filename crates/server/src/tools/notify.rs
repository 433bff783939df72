//! sw_push, sw_notification_click and sw_sync tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use swcache_client::{NotificationData, ServiceWorker};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for sw_push.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push payload. Only `url` is read.
    #[serde(default)]
    pub payload: Option<Value>,
}

/// The notification the worker would show.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Notification data URL, opened on click.
    pub url: Option<String>,
}

/// Input parameters for sw_notification_click.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// `data.url` of the clicked notification.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickOutput {
    /// URL of the window to open.
    pub open_url: String,
}

/// Input parameters for sw_sync.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncOutput {
    pub tag: String,
    /// False for tags the worker ignores.
    pub handled: bool,
}

pub async fn push_impl(worker: &ServiceWorker, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = worker.on_push(params.payload.as_ref());
    json_result(&SwPushOutput {
        title: notification.title,
        body: notification.body,
        icon: notification.icon,
        badge: notification.badge,
        url: notification.data.url,
    })
}

pub async fn notification_click_impl(
    worker: &ServiceWorker, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let open_url = worker.on_notification_click(&NotificationData { url: params.url });
    json_result(&SwNotificationClickOutput { open_url })
}

pub async fn sync_impl(worker: &ServiceWorker, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.trim().is_empty() {
        return Err(ToolError::InvalidInput("tag cannot be empty".into()).into());
    }
    let handled = worker.on_sync(&params.tag).await;
    json_result(&SwSyncOutput { tag: params.tag, handled })
}

#[cfg(test)]
mod tests {
    use super::super::testing::{output, worker};
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_push_and_click() {
        let worker = worker().await;

        let pushed: SwPushOutput =
            output(&push_impl(&worker, SwPushParams { payload: Some(json!({"url": "/events.html"})) }).await.unwrap());
        assert_eq!(pushed.title, "Heritage site");
        assert_eq!(pushed.url.as_deref(), Some("/events.html"));

        let clicked: SwNotificationClickOutput =
            output(&notification_click_impl(&worker, SwNotificationClickParams { url: pushed.url }).await.unwrap());
        assert_eq!(clicked.open_url, "/events.html");
    }

    #[tokio::test]
    async fn test_click_without_url_opens_root() {
        let worker = worker().await;
        let clicked: SwNotificationClickOutput =
            output(&notification_click_impl(&worker, SwNotificationClickParams { url: None }).await.unwrap());
        assert_eq!(clicked.open_url, "/");
    }

    #[tokio::test]
    async fn test_sync() {
        let worker = worker().await;

        let out: SwSyncOutput =
            output(&sync_impl(&worker, SwSyncParams { tag: "background-sync".into() }).await.unwrap());
        assert!(out.handled);

        let out: SwSyncOutput = output(&sync_impl(&worker, SwSyncParams { tag: "other".into() }).await.unwrap());
        assert!(!out.handled);

        assert!(sync_impl(&worker, SwSyncParams { tag: "".into() }).await.is_err());
    }
}
