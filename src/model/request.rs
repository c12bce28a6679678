/// Request forms handed over by the synchronous API layer
use super::status::Visibility;
use serde::{Deserialize, Serialize};

/// Poll part of a create or edit request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollRequest {
    pub options: Vec<String>,
    /// Seconds from now; 0 leaves the poll open-ended (or, on edit, the expiry unchanged)
    pub expires_in: i64,
    pub multiple: bool,
    pub hide_totals: bool,
}

/// Description / focus update for an already uploaded attachment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentAttributes {
    pub id: String,
    pub description: String,
    /// `"x,y"`; empty leaves focus unchanged
    pub focus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCreateRequest {
    pub status: String,
    pub spoiler_text: String,
    pub sensitive: bool,
    pub language: String,
    pub visibility: Visibility,
    pub in_reply_to_id: Option<String>,
    pub media_ids: Vec<String>,
    pub poll: Option<PollRequest>,
}

impl Default for StatusCreateRequest {
    fn default() -> Self {
        Self {
            status: String::new(),
            spoiler_text: String::new(),
            sensitive: false,
            language: String::new(),
            visibility: Visibility::Public,
            in_reply_to_id: None,
            media_ids: Vec::new(),
            poll: None,
        }
    }
}

/// Full replacement of a status' editable fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEditRequest {
    pub status: String,
    pub spoiler_text: String,
    pub sensitive: bool,
    pub language: String,
    pub media_ids: Vec<String>,
    pub media_attributes: Vec<AttachmentAttributes>,
    /// None removes any existing poll
    pub poll: Option<PollRequest>,
}
