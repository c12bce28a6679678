/// Edit history of a status
use super::StatusProcessor;
use crate::error::CourierResult;
use crate::model::{Account, Status, StatusEdit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One revision of a status as shown in its history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRevision {
    pub content: String,
    pub content_warning: String,
    pub language: String,
    pub sensitive: bool,
    pub attachment_ids: Vec<String>,
    pub attachment_descriptions: Vec<String>,
    pub poll_options: Option<Vec<String>>,
    pub poll_votes: Option<Vec<i64>>,
    pub created_at: DateTime<Utc>,
}

impl From<StatusEdit> for StatusRevision {
    fn from(edit: StatusEdit) -> Self {
        Self {
            content: edit.content,
            content_warning: edit.content_warning,
            language: edit.language,
            sensitive: edit.sensitive,
            attachment_ids: edit.attachment_ids,
            attachment_descriptions: edit.attachment_descriptions,
            poll_options: edit.poll_options,
            poll_votes: edit.poll_votes,
            created_at: edit.created_at,
        }
    }
}

impl From<&Status> for StatusRevision {
    fn from(status: &Status) -> Self {
        Self {
            content: status.content.clone(),
            content_warning: status.content_warning.clone(),
            language: status.language.clone(),
            sensitive: status.sensitive,
            attachment_ids: status.attachment_ids.clone(),
            attachment_descriptions: status.attachments.iter().map(|m| m.description.clone()).collect(),
            poll_options: status.poll.as_ref().map(|p| p.options.clone()),
            poll_votes: status
                .poll
                .as_ref()
                .filter(|p| p.counts_visible())
                .map(|p| p.votes.clone()),
            created_at: status.updated_at(),
        }
    }
}

impl StatusProcessor {
    /// Every revision of a visible status, oldest first, ending with the current one
    pub async fn history(
        &self,
        requester: Option<&Account>,
        status_id: &str,
    ) -> CourierResult<Vec<StatusRevision>> {
        let status = self.get_visible_status(requester, status_id).await?;

        let mut revisions: Vec<StatusRevision> = self
            .ctx
            .db
            .get_status_edits(&status.id)
            .await?
            .into_iter()
            .map(StatusRevision::from)
            .collect();
        revisions.push(StatusRevision::from(&status));

        Ok(revisions)
    }
}
