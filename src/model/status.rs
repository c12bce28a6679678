/// Status (post) models
use super::poll::Poll;
use crate::error::CourierError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Audience of a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Unlisted,
    FollowersOnly,
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::FollowersOnly => "followers_only",
            Visibility::Direct => "direct",
        }
    }
}

impl FromStr for Visibility {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "followers_only" | "private" => Ok(Visibility::FollowersOnly),
            "direct" => Ok(Visibility::Direct),
            other => Err(CourierError::Validation(format!("unknown visibility: {}", other))),
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ActivityStreams type of the status object; Question when a poll is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusObjectType {
    Note,
    Question,
}

impl StatusObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusObjectType::Note => "Note",
            StatusObjectType::Question => "Question",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "Question" => StatusObjectType::Question,
            _ => StatusObjectType::Note,
        }
    }
}

/// Focus point of an image, each axis in [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Focus {
    pub x: f32,
    pub y: f32,
}

impl FromStr for Focus {
    type Err = CourierError;

    /// Parse `"x,y"` as sent by clients
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CourierError::Validation(format!("invalid focus: {}", s));

        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x: f32 = x.trim().parse().map_err(|_| invalid())?;
        let y: f32 = y.trim().parse().map_err(|_| invalid())?;

        if !(-1.0..=1.0).contains(&x) || !(-1.0..=1.0).contains(&y) {
            return Err(invalid());
        }

        Ok(Focus { x, y })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub id: String,
    pub account_id: String,
    pub status_id: Option<String>,
    pub scheduled_status_id: Option<String>,
    pub description: String,
    pub focus: Focus,
    pub created_at: DateTime<Utc>,
}

impl MediaAttachment {
    pub fn new(account_id: &str, description: &str) -> Self {
        Self {
            id: super::new_id(),
            account_id: account_id.to_string(),
            status_id: None,
            scheduled_status_id: None,
            description: description.to_string(),
            focus: Focus::default(),
            created_at: Utc::now(),
        }
    }
}

/// A status as stored, with optional populated relations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    pub uri: String,
    pub account_id: String,
    pub in_reply_to_id: Option<String>,
    pub in_reply_to_account_id: Option<String>,
    pub boost_of_id: Option<String>,
    /// Rendered HTML
    pub content: String,
    pub content_warning: String,
    /// Source text as submitted
    pub text: String,
    pub language: String,
    pub sensitive: bool,
    pub visibility: Visibility,
    pub attachment_ids: Vec<String>,
    pub mention_ids: Vec<String>,
    pub tags: Vec<String>,
    /// Emoji shortcodes; never shrinks across edits
    pub emojis: Vec<String>,
    pub poll_id: Option<String>,
    pub object_type: StatusObjectType,
    pub local: bool,
    pub pinned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub poll: Option<Poll>,
    #[serde(skip)]
    pub attachments: Vec<MediaAttachment>,
}

impl Status {
    pub fn is_boost(&self) -> bool {
        self.boost_of_id.is_some()
    }

    /// Last time the status content changed
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.edited_at.unwrap_or(self.created_at)
    }
}

/// Historical snapshot of a status as it stood before one edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEdit {
    pub id: String,
    pub status_id: String,
    pub content: String,
    pub content_warning: String,
    pub text: String,
    pub language: String,
    pub sensitive: bool,
    pub attachment_ids: Vec<String>,
    pub attachment_descriptions: Vec<String>,
    pub poll_options: Option<Vec<String>>,
    /// Only kept when counts were visible at the time
    pub poll_votes: Option<Vec<i64>>,
    /// When this revision was originally published
    pub created_at: DateTime<Utc>,
}
