/// Scheduled (draft) status model
use super::{request::PollRequest, status::Visibility, StatusCreateRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A status to be published by the scheduler at `scheduled_at`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledStatus {
    pub id: String,
    pub account_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub text: String,
    pub spoiler_text: String,
    pub sensitive: bool,
    pub language: String,
    pub visibility: Visibility,
    pub in_reply_to_id: Option<String>,
    pub media_ids: Vec<String>,
    pub poll: Option<PollRequest>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledStatus {
    pub fn from_request(
        account_id: &str,
        scheduled_at: DateTime<Utc>,
        request: StatusCreateRequest,
    ) -> Self {
        Self {
            id: super::new_id(),
            account_id: account_id.to_string(),
            scheduled_at,
            text: request.status,
            spoiler_text: request.spoiler_text,
            sensitive: request.sensitive,
            language: request.language,
            visibility: request.visibility,
            in_reply_to_id: request.in_reply_to_id,
            media_ids: request.media_ids,
            poll: request.poll,
            created_at: Utc::now(),
        }
    }

    /// The request the publish path replays at fire time
    pub fn to_request(&self) -> StatusCreateRequest {
        StatusCreateRequest {
            status: self.text.clone(),
            spoiler_text: self.spoiler_text.clone(),
            sensitive: self.sensitive,
            language: self.language.clone(),
            visibility: self.visibility,
            in_reply_to_id: self.in_reply_to_id.clone(),
            media_ids: self.media_ids.clone(),
            poll: self.poll.clone().filter(|p| p.options.len() > 1),
        }
    }
}
