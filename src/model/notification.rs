/// Notification model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Mention,
    Follow,
    FollowRequest,
    Favourite,
    Reblog,
    /// A poll the account voted in or authored has ended
    Poll,
    /// A status the account interacted with was edited
    Update,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Mention => "mention",
            NotificationType::Follow => "follow",
            NotificationType::FollowRequest => "follow_request",
            NotificationType::Favourite => "favourite",
            NotificationType::Reblog => "reblog",
            NotificationType::Poll => "poll",
            NotificationType::Update => "update",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        Some(match s {
            "mention" => NotificationType::Mention,
            "follow" => NotificationType::Follow,
            "follow_request" => NotificationType::FollowRequest,
            "favourite" => NotificationType::Favourite,
            "reblog" => NotificationType::Reblog,
            "poll" => NotificationType::Poll,
            "update" => NotificationType::Update,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub notification_type: NotificationType,
    pub target_account_id: String,
    pub origin_account_id: String,
    /// Status or edit the notification refers to, if any
    pub status_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
