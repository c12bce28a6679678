/// Status creation
use super::content::validate_status_content;
use super::{status_uri, StatusProcessor};
use crate::error::{CourierError, CourierResult};
use crate::messages::{ActivityType, Message, Payload};
use crate::model::{new_id, Account, Poll, PollRequest, Status, StatusCreateRequest, StatusObjectType};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

/// Build a new poll for `status_id` from a formatted request
pub(crate) fn new_poll(status_id: &str, form: &PollRequest, now: DateTime<Utc>) -> Poll {
    let expires_at = (form.expires_in > 0).then(|| now + Duration::seconds(form.expires_in));
    Poll::new(
        status_id,
        form.options.clone(),
        form.multiple,
        form.hide_totals,
        expires_at,
    )
}

impl StatusProcessor {
    /// Create a new status for `requester`
    pub async fn create(&self, requester: &Account, form: StatusCreateRequest) -> CourierResult<Status> {
        self.create_with_id(requester, &new_id(), form).await
    }

    /// Create a status under a caller-chosen id
    ///
    /// Scheduled publication reuses the draft's id so attachments staged on
    /// the draft pass the "not attached elsewhere" check.
    pub(crate) async fn create_with_id(
        &self,
        requester: &Account,
        status_id: &str,
        form: StatusCreateRequest,
    ) -> CourierResult<Status> {
        let now = Utc::now();

        validate_status_content(
            &self.ctx.config,
            &form.status,
            &form.spoiler_text,
            &form.media_ids,
            form.poll.as_ref(),
        )?;

        let in_reply_to = match &form.in_reply_to_id {
            Some(id) => Some(self.process_reply_to(requester, id).await?),
            None => None,
        };

        let mut poll_form = form.poll.clone();
        let content = self
            .process_content(
                requester,
                &form.status,
                &form.spoiler_text,
                &form.language,
                poll_form.as_mut(),
            )
            .await?;

        let attachments = self
            .process_media(&requester.id, status_id, &form.media_ids)
            .await?;

        let poll = poll_form.as_ref().map(|p| new_poll(status_id, p, now));

        let mut status = Status {
            id: status_id.to_string(),
            uri: status_uri(requester, status_id),
            account_id: requester.id.clone(),
            in_reply_to_id: in_reply_to.as_ref().map(|s| s.id.clone()),
            in_reply_to_account_id: in_reply_to.as_ref().map(|s| s.account_id.clone()),
            boost_of_id: None,
            content: content.content,
            content_warning: content.content_warning,
            text: form.status,
            language: content.language,
            sensitive: form.sensitive,
            visibility: form.visibility,
            attachment_ids: form.media_ids,
            mention_ids: content.mention_ids,
            tags: content.tags,
            emojis: content.emojis,
            poll_id: poll.as_ref().map(|p| p.id.clone()),
            object_type: if poll.is_some() {
                StatusObjectType::Question
            } else {
                StatusObjectType::Note
            },
            local: requester.is_local(),
            pinned_at: None,
            created_at: now,
            edited_at: None,
            poll: None,
            attachments: Vec::new(),
        };

        if let Some(poll) = &poll {
            self.ctx.db.insert_poll(poll).await?;
        }
        self.ctx.db.insert_status(&status).await?;

        let mut attached = Vec::with_capacity(attachments.len());
        for mut media in attachments {
            media.status_id = Some(status.id.clone());
            media.scheduled_status_id = None;
            self.ctx.db.update_media(&media).await?;
            attached.push(media);
        }
        status.attachments = attached;
        status.poll = poll;

        if let Some(poll) = &status.poll {
            if let Err(e) = self.polls.schedule_expiry(poll) {
                error!(status = %status.id, "Error scheduling poll expiry: {}", e);
            }
        }

        debug!(status = %status.id, account = %requester.id, "Status created");

        self.ctx.workers.route(Message::new(
            ActivityType::Create,
            Payload::Status(Box::new(status.clone())),
            requester.clone(),
        ));

        Ok(status)
    }

    /// Resolve the replied-to status
    async fn process_reply_to(&self, requester: &Account, in_reply_to_id: &str) -> CourierResult<Status> {
        let parent = self
            .get_visible_status(Some(requester), in_reply_to_id)
            .await
            .map_err(|e| match e {
                CourierError::NotFound(_) => {
                    CourierError::NotFound(format!("cannot reply to status {}", in_reply_to_id))
                }
                other => other,
            })?;

        if parent.is_boost() {
            return Err(CourierError::Validation("cannot reply to a boost".to_string()));
        }

        Ok(parent)
    }
}
