//! Inbound control messages and push notification payloads.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Site logo used as notification icon and badge.
pub const SITE_ICON: &str = "/assets/arabic-calligraphy-logo.png";

pub const VIBRATE_PATTERN: [u32; 3] = [200, 100, 200];

/// Messages a page posts to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Page timing data; logged and otherwise dropped.
    PerformanceMetrics {
        #[serde(default)]
        metrics: Value,
    },
    /// URLs to fetch into the dynamic generation ahead of use.
    PreloadResources {
        #[serde(default)]
        resources: Vec<String>,
    },
}

impl ControlMessage {
    /// Parse a posted message. Unknown or malformed messages yield `None`.
    pub fn parse(data: &Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PushPayload {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// What the host should show for a push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationSpec {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: Option<Value>,
    pub actions: Vec<NotificationAction>,
}

impl From<PushPayload> for NotificationSpec {
    fn from(payload: PushPayload) -> Self {
        let action = |action: &str, title: &str| NotificationAction {
            action: action.to_string(),
            title: title.to_string(),
            icon: SITE_ICON.to_string(),
        };
        Self {
            title: payload.title,
            body: payload.body,
            icon: SITE_ICON.to_string(),
            badge: SITE_ICON.to_string(),
            vibrate: VIBRATE_PATTERN.to_vec(),
            data: payload.data,
            actions: vec![action("open", "Open"), action("close", "Close")],
        }
    }
}
