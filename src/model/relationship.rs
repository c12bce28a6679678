/// Relationship and interaction models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Established follow from `account_id` to `target_account_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub id: String,
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    pub created_at: DateTime<Utc>,
}

/// Follow awaiting approval by a locked target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowRequest {
    pub id: String,
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    pub created_at: DateTime<Utc>,
}

impl FollowRequest {
    /// Turn an accepted request into the follow it stands for
    pub fn into_follow(self) -> Follow {
        Follow {
            id: self.id,
            uri: self.uri,
            account_id: self.account_id,
            target_account_id: self.target_account_id,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    pub created_at: DateTime<Utc>,
}

/// Like of a status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fave {
    pub id: String,
    pub uri: String,
    pub account_id: String,
    pub target_account_id: String,
    pub status_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub account_id: String,
    pub status_id: String,
    pub created_at: DateTime<Utc>,
}

/// Mute of `target_account_id` by `account_id`
///
/// Keeps the target's statuses off the muter's timelines. With
/// `notifications` set, notifications from the target are dropped as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMute {
    pub id: String,
    pub account_id: String,
    pub target_account_id: String,
    pub notifications: bool,
    /// None mutes indefinitely
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserMute {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at > now,
            None => true,
        }
    }
}

/// Notifications about a thread silenced for `account_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMute {
    pub id: String,
    pub account_id: String,
    /// Id of the thread's top-level status
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
}
