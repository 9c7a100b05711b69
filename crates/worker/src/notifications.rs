//! Push notification rendering.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BODY: &str = "New update available!";
pub const ICON: &str = "/icon-192x192.png";
pub const EXPLORE: &str = "explore";
pub const CLOSE: &str = "close";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build the notification for a push. A push without data gets the
    /// default body; an empty text payload is shown as-is.
    pub fn from_push(title: &str, payload: Option<&str>) -> Self {
        let body = payload.unwrap_or(DEFAULT_BODY);
        Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: ICON.into(),
            badge: ICON.into(),
            vibrate: vec![100, 50, 100],
            data: NotificationData { date_of_arrival: Utc::now().timestamp_millis(), primary_key: 1 },
            actions: vec![
                NotificationAction { action: EXPLORE.into(), title: "View Portfolio".into(), icon: ICON.into() },
                NotificationAction { action: CLOSE.into(), title: "Close".into(), icon: ICON.into() },
            ],
        }
    }
}
