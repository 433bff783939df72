//! Push, notification click and background sync handlers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ServiceWorker;

/// Page opened when a notification carries no URL.
pub const DEFAULT_CLICK_URL: &str = "/";

/// The only sync tag the worker acts on.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Fixed text of push notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub title: String,
    pub body: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A notification to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub data: NotificationData,
}

impl ServiceWorker {
    /// Build the notification shown for a push. Only `payload.url` is read.
    pub fn on_push(&self, payload: Option<&Value>) -> Notification {
        let url = payload
            .and_then(|p| p.get("url"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let template = &self.config.notification;

        tracing::info!(url = url.as_deref().unwrap_or(""), "push received");
        Notification {
            title: template.title.clone(),
            body: template.body.clone(),
            icon: template.icon.clone(),
            badge: template.icon.clone(),
            data: NotificationData { url },
        }
    }

    /// URL to open for a clicked notification.
    pub fn on_notification_click(&self, data: &NotificationData) -> String {
        let target = data.url.clone().unwrap_or_else(|| DEFAULT_CLICK_URL.to_string());
        tracing::info!(url = %target, "notification clicked; opening window");
        target
    }

    /// Run the sync step for `tag`. Returns whether the tag was handled.
    pub async fn on_sync(&self, tag: &str) -> bool {
        if tag != BACKGROUND_SYNC_TAG {
            tracing::debug!(tag, "ignoring sync event");
            return false;
        }
        tracing::info!(tag, "background sync completed");
        true
    }
}
