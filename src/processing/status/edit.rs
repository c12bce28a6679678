/// Status edits
///
/// An edit replaces the editable fields of a status wholesale. Before the
/// live row is overwritten, its current state is kept as a [`StatusEdit`]
/// snapshot, so history always shows what each revision looked like.
/// Embedded polls are either updated in place (hide counts, a new expiry)
/// or, when voting would be affected, deleted and recreated without votes.
///
/// An edit holds the status' URI lock from loading the status until the
/// update is queued, and the poll's lock while the poll is reconciled and
/// snapshotted, so neither a second edit nor a vote can slip in between.
use super::content::validate_status_content;
use super::create::new_poll;
use super::StatusProcessor;
use crate::error::{CourierError, CourierResult};
use crate::locks::ResourceGuard;
use crate::messages::{ActivityType, Message, Payload};
use crate::metrics;
use crate::model::{
    new_id, Account, AttachmentAttributes, Focus, MediaAttachment, Poll, PollRequest, Status,
    StatusEdit, StatusEditRequest, StatusObjectType,
};
use crate::processing::polls::poll_lock_key;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error};

/// Outcome of reconciling the stored poll with the requested one
struct PollEdit {
    /// Poll the status carries after the edit
    poll: Option<Poll>,
    /// Anything about the poll changed, in place or not
    edited: bool,
    /// Held until the edit is stored, when the status had a poll
    guard: Option<ResourceGuard>,
}

impl PollEdit {
    fn unchanged(poll: Option<Poll>, guard: Option<ResourceGuard>) -> Self {
        Self {
            poll,
            edited: false,
            guard,
        }
    }
}

impl StatusProcessor {
    /// Apply `form` to one of `requester`'s statuses
    pub async fn edit(
        &self,
        requester: &Account,
        status_id: &str,
        form: StatusEditRequest,
    ) -> CourierResult<Status> {
        let result = self.apply_edit(requester, status_id, form).await;

        metrics::record_status_edit(match &result {
            Ok(_) => "applied",
            Err(CourierError::Unprocessable(_)) => "rejected_noop",
            Err(e) if e.is_user_facing() => "rejected",
            Err(_) => "failed",
        });

        result
    }

    async fn apply_edit(
        &self,
        requester: &Account,
        status_id: &str,
        form: StatusEditRequest,
    ) -> CourierResult<Status> {
        let loaded = self.get_own_status(requester, status_id).await?;
        let _guard = self.ctx.locks.lock(&loaded.uri).await;
        // Another edit may have finished while we waited
        let mut status = self.get_own_status(requester, status_id).await?;
        let now = Utc::now();

        validate_status_content(
            &self.ctx.config,
            &form.status,
            &form.spoiler_text,
            &form.media_ids,
            form.poll.as_ref(),
        )?;

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

        let mut media = self
            .process_media(&requester.id, &status.id, &form.media_ids)
            .await?;
        let media_edited = self.process_media_edits(&mut media, &form.media_attributes).await?;

        let PollEdit {
            poll,
            edited: poll_edited,
            guard: _poll_guard,
        } = self
            .process_poll_edit(&mut status, poll_form.as_ref(), now)
            .await?;

        // A different poll id means the poll was replaced, added or removed
        let poll_changed = poll.as_ref().map(|p| &p.id) != status.poll_id.as_ref();

        let content_changed = status.content != content.content;
        let warning_changed = status.content_warning != content.content_warning;
        let language_changed = status.language != content.language;
        let any_content_changed = content_changed || warning_changed || poll_edited;
        let media_changed = status.attachment_ids != form.media_ids;

        let mut columns: Vec<&str> = vec!["edited_at"];
        if content_changed {
            columns.extend(["content", "text"]);
        }
        if warning_changed {
            columns.push("content_warning");
        }
        if language_changed {
            columns.push("language");
        }
        if status.sensitive != form.sensitive {
            columns.push("sensitive");
        }
        if media_changed {
            columns.push("attachment_ids");
        }
        if poll_changed {
            columns.push("poll_id");
            if status.poll.is_none() || poll.is_none() {
                columns.push("object_type");
            }
        }

        if any_content_changed {
            if status.mention_ids != content.mention_ids {
                columns.push("mention_ids");
                status.mention_ids = content.mention_ids.clone();
            }
            if status.tags != content.tags {
                columns.push("tags");
                status.tags = content.tags.clone();
            }
            if status.emojis != content.emojis {
                // Emojis of every revision stay referenced
                for emoji in &content.emojis {
                    if !status.emojis.contains(emoji) {
                        status.emojis.push(emoji.clone());
                    }
                }
                columns.push("emojis");
            }
        }

        if columns.len() == 1 && !media_edited && !poll_edited {
            return Err(CourierError::Unprocessable("status was not changed".to_string()));
        }

        let edit = snapshot(&status, poll_changed);
        self.ctx.db.insert_status_edit(&edit).await?;

        if media_changed {
            self.reattach_media(&status, &mut media).await?;
        }

        status.content = content.content;
        status.content_warning = content.content_warning;
        status.text = form.status;
        status.language = content.language;
        status.sensitive = form.sensitive;
        status.attachment_ids = form.media_ids;
        status.attachments = media;
        status.edited_at = Some(now);

        match poll {
            Some(poll) => {
                status.object_type = StatusObjectType::Question;
                status.poll_id = Some(poll.id.clone());
                status.poll = Some(poll);
            }
            None => {
                status.object_type = StatusObjectType::Note;
                status.poll_id = None;
                status.poll = None;
            }
        }

        self.ctx.db.update_status(&status, &columns).await?;

        if poll_changed {
            if let Some(poll) = status.poll.as_ref().filter(|p| p.expires_at.is_some()) {
                if let Err(e) = self.polls.schedule_expiry(poll) {
                    error!(status = %status.id, "Error scheduling poll expiry: {}", e);
                }
            }
        }

        debug!(status = %status.id, columns = ?columns, "Status edited");

        self.ctx.workers.client.push(Some(Message::new(
            ActivityType::Update,
            Payload::Status(Box::new(status.clone())),
            requester.clone(),
        )));

        Ok(status)
    }

    /// Apply description and focus updates to the loaded attachments
    async fn process_media_edits(
        &self,
        attachments: &mut [MediaAttachment],
        attributes: &[AttachmentAttributes],
    ) -> CourierResult<bool> {
        let mut edited = false;

        for attr in attributes {
            let media = attachments
                .iter_mut()
                .find(|m| m.id == attr.id)
                .ok_or_else(|| CourierError::Validation(format!("media not found: {}", attr.id)))?;

            let mut changed = false;

            if attr.description != media.description {
                media.description = attr.description.clone();
                changed = true;
            }

            if !attr.focus.is_empty() {
                let focus: Focus = attr.focus.parse()?;
                if focus != media.focus {
                    media.focus = focus;
                    changed = true;
                }
            }

            if changed {
                self.ctx.db.update_media(media).await?;
                edited = true;
            }
        }

        Ok(edited)
    }

    /// Reconcile the status' current poll with the requested one
    ///
    /// The stored poll is re-read under its lock, so votes and closes that
    /// landed since the status was loaded are neither lost nor orphaned.
    /// Cosmetic changes are written to `status.poll` in place, so the
    /// snapshot taken afterwards sees the updated hide-counts flag.
    async fn process_poll_edit(
        &self,
        status: &mut Status,
        form: Option<&PollRequest>,
        now: DateTime<Utc>,
    ) -> CourierResult<PollEdit> {
        let Some(poll_id) = status.poll.as_ref().map(|p| p.id.clone()) else {
            return match form {
                Some(form) => self.create_poll(&status.id, form, now).await,
                None => Ok(PollEdit::unchanged(None, None)),
            };
        };

        let guard = self.ctx.locks.lock(&poll_lock_key(&poll_id)).await;

        let Some(mut original) = self.ctx.db.get_poll(&poll_id).await? else {
            status.poll = None;
            return match form {
                Some(form) => self.create_poll(&status.id, form, now).await,
                None => Ok(PollEdit::unchanged(None, None)),
            };
        };
        status.poll = Some(original.clone());

        let Some(form) = form else {
            self.delete_poll(&original).await?;
            return Ok(PollEdit {
                poll: None,
                edited: true,
                guard: Some(guard),
            });
        };

        let structural = form.options != original.options
            || form.multiple != original.multiple
            || (original.is_closed() && form.expires_in != 0);
        if structural {
            self.delete_poll(&original).await?;
            let mut created = self.create_poll(&status.id, form, now).await?;
            created.guard = Some(guard);
            return Ok(created);
        }

        let mut changed = false;

        if form.hide_totals != original.hide_counts {
            original.hide_counts = form.hide_totals;
            changed = true;
        }

        // A duration can't be compared with the stored instant, so any
        // positive expiry counts as a change
        let expires_at = (form.expires_in > 0).then(|| now + Duration::seconds(form.expires_in));
        if let Some(expires_at) = expires_at {
            if original.expires_at.is_some() {
                self.polls.cancel_expiry(&original.id);
            }
            original.expires_at = Some(expires_at);
            changed = true;
        }

        if !changed {
            return Ok(PollEdit::unchanged(Some(original), Some(guard)));
        }

        self.ctx.db.update_poll_settings(&original).await?;

        if expires_at.is_some() {
            if let Err(e) = self.polls.schedule_expiry(&original) {
                error!(poll = %original.id, "Error scheduling poll expiry: {}", e);
            }
        }

        status.poll = Some(original.clone());
        Ok(PollEdit {
            poll: Some(original),
            edited: true,
            guard: Some(guard),
        })
    }

    async fn create_poll(
        &self,
        status_id: &str,
        form: &PollRequest,
        now: DateTime<Utc>,
    ) -> CourierResult<PollEdit> {
        let poll = new_poll(status_id, form, now);
        self.ctx.db.insert_poll(&poll).await?;
        Ok(PollEdit {
            poll: Some(poll),
            edited: true,
            guard: None,
        })
    }

    /// Remove a poll, cancelling its close task if it could still fire
    pub(crate) async fn delete_poll(&self, poll: &Poll) -> CourierResult<()> {
        if poll.expires_at.is_some() && !poll.is_closed() {
            self.polls.cancel_expiry(&poll.id);
        }
        self.ctx.db.delete_poll(&poll.id).await
    }

    /// Point attachment rows at the status after its media list changed
    async fn reattach_media(&self, status: &Status, media: &mut [MediaAttachment]) -> CourierResult<()> {
        for removed in status.attachments.iter().filter(|m| !media.iter().any(|n| n.id == m.id)) {
            let mut removed = removed.clone();
            removed.status_id = None;
            self.ctx.db.update_media(&removed).await?;
        }

        for added in media.iter_mut().filter(|m| m.status_id.as_deref() != Some(status.id.as_str())) {
            added.status_id = Some(status.id.clone());
            self.ctx.db.update_media(added).await?;
        }

        Ok(())
    }
}

/// Pre-edit state of `status`
///
/// Vote counts are only kept when they could be seen at the time, or when
/// the poll is being replaced and its results would otherwise be lost.
fn snapshot(status: &Status, poll_changed: bool) -> StatusEdit {
    let (poll_options, poll_votes) = match &status.poll {
        Some(poll) => {
            let votes = (poll_changed || !poll.hide_counts || poll.is_closed()).then(|| poll.votes.clone());
            (Some(poll.options.clone()), votes)
        }
        None => (None, None),
    };

    StatusEdit {
        id: new_id(),
        status_id: status.id.clone(),
        content: status.content.clone(),
        content_warning: status.content_warning.clone(),
        text: status.text.clone(),
        language: status.language.clone(),
        sensitive: status.sensitive,
        attachment_ids: status.attachment_ids.clone(),
        attachment_descriptions: status.attachments.iter().map(|m| m.description.clone()).collect(),
        poll_options,
        poll_votes,
        created_at: status.updated_at(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StatusCreateRequest;
    use crate::processing::testing::TestEnv;

    fn edit_form(text: &str) -> StatusEditRequest {
        StatusEditRequest {
            status: text.to_string(),
            ..Default::default()
        }
    }

    async fn poll_status(env: &TestEnv, author: &Account, hide_totals: bool) -> Status {
        env.processor
            .status
            .create(
                author,
                StatusCreateRequest {
                    status: "vote".to_string(),
                    poll: Some(PollRequest {
                        options: vec!["yes".into(), "no".into()],
                        expires_in: 3600,
                        hide_totals,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    fn poll_form(options: &[&str], expires_in: i64, hide_totals: bool) -> Option<PollRequest> {
        Some(PollRequest {
            options: options.iter().map(|o| o.to_string()).collect(),
            expires_in,
            hide_totals,
            multiple: false,
        })
    }

    #[tokio::test]
    async fn test_noop_edit_is_rejected() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let status = env.post(&alice, "hello").await;
        env.drain_client();

        let err = env
            .processor
            .status
            .edit(&alice, &status.id, edit_form("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::Unprocessable(ref m) if m == "status was not changed"));
        assert!(env.ctx.workers.client.queue().is_empty());
        assert!(env.ctx.db.get_status_edits(&status.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_edit_snapshots_previous_revision() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let status = env.post(&alice, "first").await;
        env.drain_client();

        let edited = env
            .processor
            .status
            .edit(&alice, &status.id, edit_form("second #new"))
            .await
            .unwrap();
        assert_eq!(edited.text, "second #new");
        assert_eq!(edited.tags, vec!["new"]);
        assert!(edited.edited_at.is_some());

        let edits = env.ctx.db.get_status_edits(&status.id).await.unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].text, "first");
        assert_eq!(edits[0].created_at, status.created_at);

        let stored = env.ctx.db.get_status(&status.id).await.unwrap().unwrap();
        assert_eq!(stored.content, "<p>second #new</p>");

        let msgs = env.drain_client();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].activity_type(), ActivityType::Update);
    }

    #[tokio::test]
    async fn test_edit_other_authors_status_is_not_found() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        let status = env.post(&alice, "mine").await;

        let err = env
            .processor
            .status
            .edit(&bob, &status.id, edit_form("yours"))
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validation_fails_before_any_write() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let status = env.post(&alice, "hello").await;
        env.drain_client();

        let mut form = edit_form("hello again");
        form.poll = poll_form(&["only", ""], 0, false);
        assert!(env.processor.status.edit(&alice, &status.id, form).await.is_err());

        let stored = env.ctx.db.get_status(&status.id).await.unwrap().unwrap();
        assert_eq!(stored.text, "hello");
        assert!(env.ctx.workers.client.queue().is_empty());
    }

    #[tokio::test]
    async fn test_media_description_edit_counts_as_change() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let media = MediaAttachment::new(&alice.id, "old");
        env.ctx.db.insert_media(&media).await.unwrap();

        let status = env
            .processor
            .status
            .create(
                &alice,
                StatusCreateRequest {
                    status: "pic".to_string(),
                    media_ids: vec![media.id.clone()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut form = edit_form("pic");
        form.media_ids = vec![media.id.clone()];
        form.media_attributes = vec![AttachmentAttributes {
            id: media.id.clone(),
            description: "new".to_string(),
            focus: "0.5,0.5".to_string(),
        }];
        env.processor.status.edit(&alice, &status.id, form).await.unwrap();

        let stored = env.ctx.db.get_media(&media.id).await.unwrap().unwrap();
        assert_eq!(stored.description, "new");
        assert_eq!(stored.focus, Focus { x: 0.5, y: 0.5 });

        let edits = env.ctx.db.get_status_edits(&status.id).await.unwrap();
        assert_eq!(edits[0].attachment_descriptions, vec!["old"]);

        let mut form = edit_form("pic");
        form.media_ids = vec![media.id.clone()];
        form.media_attributes = vec![AttachmentAttributes {
            id: "unknown".to_string(),
            ..Default::default()
        }];
        let err = env.processor.status.edit(&alice, &status.id, form).await.unwrap_err();
        assert!(matches!(err, CourierError::Validation(_)));
    }

    #[tokio::test]
    async fn test_structural_poll_change_resets_votes() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        let status = poll_status(&env, &alice, false).await;
        let old_poll = status.poll.clone().unwrap();

        env.processor.polls.vote(&bob, &old_poll.id, vec![0]).await.unwrap();

        let mut form = edit_form("vote");
        form.poll = poll_form(&["yes", "no", "maybe"], 600, false);
        let edited = env.processor.status.edit(&alice, &status.id, form).await.unwrap();

        let new_poll = edited.poll.unwrap();
        assert_ne!(new_poll.id, old_poll.id);
        assert_eq!(new_poll.votes, vec![0, 0, 0]);
        assert!(env.ctx.db.get_poll(&old_poll.id).await.unwrap().is_none());
        assert!(!env.ctx.workers.scheduler.is_pending(&old_poll.id));
        assert!(env.ctx.workers.scheduler.is_pending(&new_poll.id));

        let edits = env.ctx.db.get_status_edits(&status.id).await.unwrap();
        assert_eq!(edits[0].poll_votes, Some(vec![1, 0]));
    }

    #[tokio::test]
    async fn test_hidden_counts_are_not_snapshotted() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        let status = poll_status(&env, &alice, true).await;
        let poll_id = status.poll.as_ref().unwrap().id.clone();

        env.processor.polls.vote(&bob, &poll_id, vec![1]).await.unwrap();

        let mut form = edit_form("vote, edited");
        form.poll = poll_form(&["yes", "no"], 0, true);
        let edited = env.processor.status.edit(&alice, &status.id, form).await.unwrap();

        // Same poll kept in place, votes intact
        assert_eq!(edited.poll.as_ref().unwrap().id, poll_id);
        assert_eq!(edited.poll.as_ref().unwrap().votes, vec![0, 1]);

        let edits = env.ctx.db.get_status_edits(&status.id).await.unwrap();
        assert_eq!(edits[0].poll_options, Some(vec!["yes".to_string(), "no".to_string()]));
        assert_eq!(edits[0].poll_votes, None);
    }

    #[tokio::test]
    async fn test_cosmetic_poll_change_reschedules_expiry() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let status = poll_status(&env, &alice, false).await;
        let poll = status.poll.clone().unwrap();

        let mut form = edit_form("vote");
        form.poll = poll_form(&["yes", "no"], 7200, true);
        let edited = env.processor.status.edit(&alice, &status.id, form).await.unwrap();

        let updated = edited.poll.unwrap();
        assert_eq!(updated.id, poll.id);
        assert!(updated.hide_counts);
        assert!(updated.expires_at > poll.expires_at);
        assert!(env.ctx.workers.scheduler.is_pending(&poll.id));

        // Counts were hidden by this very edit, so the snapshot drops them
        let edits = env.ctx.db.get_status_edits(&status.id).await.unwrap();
        assert_eq!(edits[0].poll_votes, None);
    }

    #[tokio::test]
    async fn test_removing_poll_turns_question_into_note() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let status = poll_status(&env, &alice, false).await;
        let poll_id = status.poll.as_ref().unwrap().id.clone();

        let edited = env
            .processor
            .status
            .edit(&alice, &status.id, edit_form("vote"))
            .await
            .unwrap();

        assert_eq!(edited.object_type, StatusObjectType::Note);
        assert!(edited.poll_id.is_none());
        assert!(env.ctx.db.get_poll(&poll_id).await.unwrap().is_none());
        assert!(!env.ctx.workers.scheduler.is_pending(&poll_id));

        let stored = env.ctx.db.get_status(&status.id).await.unwrap().unwrap();
        assert_eq!(stored.object_type, StatusObjectType::Note);
    }

    #[tokio::test]
    async fn test_emojis_accumulate_across_edits() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let status = env.post(&alice, "hi :wave:").await;

        let edited = env
            .processor
            .status
            .edit(&alice, &status.id, edit_form("hi :blobcat:"))
            .await
            .unwrap();
        assert_eq!(edited.emojis, vec!["wave", "blobcat"]);
    }

    #[tokio::test]
    async fn test_cosmetic_poll_edit_keeps_votes_cast_after_loading() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        let status = poll_status(&env, &alice, false).await;
        let poll_id = status.poll.as_ref().unwrap().id.clone();

        let mut loaded = env.processor.status.get_own_status(&alice, &status.id).await.unwrap();
        env.processor.polls.vote(&bob, &poll_id, vec![0]).await.unwrap();

        let edit = env
            .processor
            .status
            .process_poll_edit(&mut loaded, poll_form(&["yes", "no"], 0, true).as_ref(), Utc::now())
            .await
            .unwrap();
        assert!(edit.edited);
        drop(edit);

        let stored = env.ctx.db.get_poll(&poll_id).await.unwrap().unwrap();
        assert!(stored.hide_counts);
        assert_eq!(stored.votes, vec![1, 0]);
        assert_eq!(stored.voters, 1);
        assert_eq!(env.ctx.db.get_poll_votes(&poll_id).await.unwrap().len(), 1);
        assert_eq!(loaded.poll.unwrap().votes, vec![1, 0]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_vote_racing_poll_replacement_leaves_no_orphan() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        let status = poll_status(&env, &alice, false).await;
        let poll_id = status.poll.as_ref().unwrap().id.clone();

        let editor = env.processor.clone();
        let author = alice.clone();
        let status_id = status.id.clone();
        let edit = tokio::spawn(async move {
            let mut form = edit_form("vote");
            form.poll = poll_form(&["yes", "no", "maybe"], 600, false);
            editor.status.edit(&author, &status_id, form).await
        });
        let voter = env.processor.clone();
        let target = poll_id.clone();
        let vote = tokio::spawn(async move { voter.polls.vote(&bob, &target, vec![0]).await });

        edit.await.unwrap().unwrap();
        if let Err(e) = vote.await.unwrap() {
            assert!(matches!(e, CourierError::NotFound(_)));
        }

        assert!(env.ctx.db.get_poll(&poll_id).await.unwrap().is_none());
        assert!(env.ctx.db.get_poll_votes(&poll_id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_edits_snapshot_distinct_revisions() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let status = env.post(&alice, "v0").await;

        let handles: Vec<_> = ["v1", "v2"]
            .into_iter()
            .map(|text| {
                let processor = env.processor.clone();
                let alice = alice.clone();
                let status_id = status.id.clone();
                tokio::spawn(async move { processor.status.edit(&alice, &status_id, edit_form(text)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let edits = env.ctx.db.get_status_edits(&status.id).await.unwrap();
        let texts: Vec<_> = edits.iter().map(|e| e.text.as_str()).collect();
        assert!(texts == ["v0", "v1"] || texts == ["v0", "v2"], "history was {:?}", texts);

        let stored = env.ctx.db.get_status(&status.id).await.unwrap().unwrap();
        assert_ne!(stored.text, texts[1]);
    }
}
