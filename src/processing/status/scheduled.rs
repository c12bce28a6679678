/// Scheduled (draft) statuses and their publication
use super::content::validate_status_content;
use super::StatusProcessor;
use crate::error::{CourierError, CourierResult};
use crate::model::{Account, ScheduledStatus, Status, StatusCreateRequest};
use crate::workers::ScheduledTask;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

impl StatusProcessor {
    /// Store a status to be published at `scheduled_at`
    pub async fn schedule(
        &self,
        requester: &Account,
        scheduled_at: DateTime<Utc>,
        form: StatusCreateRequest,
    ) -> CourierResult<ScheduledStatus> {
        let min_delay = self.ctx.config.scheduled.min_delay_secs;
        if scheduled_at < Utc::now() + Duration::seconds(min_delay) {
            return Err(CourierError::Validation(format!(
                "scheduled_at must be at least {} seconds in the future",
                min_delay
            )));
        }

        validate_status_content(
            &self.ctx.config,
            &form.status,
            &form.spoiler_text,
            &form.media_ids,
            form.poll.as_ref(),
        )?;

        self.validate_scheduled_limits(&requester.id, scheduled_at, None)
            .await?;

        let scheduled = ScheduledStatus::from_request(&requester.id, scheduled_at, form);

        let media = self
            .process_media(&requester.id, &scheduled.id, &scheduled.media_ids)
            .await?;

        self.ctx.db.insert_scheduled_status(&scheduled).await?;
        for mut attachment in media {
            attachment.scheduled_status_id = Some(scheduled.id.clone());
            self.ctx.db.update_media(&attachment).await?;
        }

        if let Err(e) = self.schedule_publication(&scheduled) {
            self.ctx.db.delete_scheduled_status(&scheduled.id).await?;
            return Err(e);
        }

        Ok(scheduled)
    }

    /// Move a draft to a new publication time
    pub async fn reschedule(
        &self,
        requester: &Account,
        id: &str,
        scheduled_at: DateTime<Utc>,
    ) -> CourierResult<ScheduledStatus> {
        let mut scheduled = self.get_own_scheduled(requester, id).await?;

        self.validate_scheduled_limits(&requester.id, scheduled_at, Some(scheduled.scheduled_at))
            .await?;

        scheduled.scheduled_at = scheduled_at;
        self.ctx.db.update_scheduled_at(id, scheduled_at).await?;

        if !self.ctx.workers.scheduler.cancel(id) {
            return Err(CourierError::Internal(
                "failed to cancel scheduled status".to_string(),
            ));
        }

        self.schedule_publication(&scheduled)?;
        Ok(scheduled)
    }

    /// Drop a draft before it is published
    pub async fn delete_scheduled(&self, requester: &Account, id: &str) -> CourierResult<()> {
        self.get_own_scheduled(requester, id).await?;

        if !self.ctx.workers.scheduler.cancel(id) {
            return Err(CourierError::Internal(
                "failed to cancel scheduled status".to_string(),
            ));
        }

        self.ctx.db.delete_scheduled_status(id).await?;
        Ok(())
    }

    /// Publish a draft whose time has come; fired by the scheduler
    ///
    /// The draft survives a failed publication.
    pub async fn publish_scheduled(&self, id: &str) -> CourierResult<Option<Status>> {
        let Some(scheduled) = self.ctx.db.get_scheduled_status(id).await? else {
            warn!(scheduled_status = id, "Scheduled status vanished before publication");
            return Ok(None);
        };

        let author = self
            .ctx
            .db
            .get_account(&scheduled.account_id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("account {}", scheduled.account_id)))?;

        let status = self
            .create_with_id(&author, &scheduled.id, scheduled.to_request())
            .await
            .map_err(|e| {
                error!(scheduled_status = id, "Could not publish scheduled status: {}", e);
                e
            })?;

        if let Err(e) = self.ctx.db.delete_scheduled_status(id).await {
            error!(scheduled_status = id, "Error deleting published draft: {}", e);
        }

        info!(scheduled_status = id, status = %status.id, "Published scheduled status");
        Ok(Some(status))
    }

    /// Register every stored draft with the scheduler
    ///
    /// Drafts are attempted independently; the first failure is returned
    /// after all were tried.
    pub async fn schedule_all_scheduled(&self) -> CourierResult<usize> {
        let mut scheduled = 0;
        let mut first_error = None;

        for draft in self.ctx.db.all_scheduled_statuses().await? {
            match self.schedule_publication(&draft) {
                Ok(()) => scheduled += 1,
                Err(e) => {
                    error!(scheduled_status = %draft.id, "Failed scheduling publication: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(scheduled),
        }
    }

    fn schedule_publication(&self, scheduled: &ScheduledStatus) -> CourierResult<()> {
        let task = ScheduledTask::publish_status(&scheduled.id, scheduled.scheduled_at);
        if !self.ctx.workers.scheduler.add_once(task) {
            return Err(CourierError::Internal(format!(
                "failed adding status {} to scheduler",
                scheduled.id
            )));
        }

        info!(
            scheduled_status = %scheduled.id,
            at = %scheduled.scheduled_at.format("%b %e %Y %H:%M:%S"),
            "Scheduled status publication"
        );
        Ok(())
    }

    async fn get_own_scheduled(&self, requester: &Account, id: &str) -> CourierResult<ScheduledStatus> {
        match self.ctx.db.get_scheduled_status(id).await? {
            Some(scheduled) if scheduled.account_id == requester.id => Ok(scheduled),
            _ => Err(CourierError::NotFound("scheduled status not found".to_string())),
        }
    }

    /// Daily and total draft limits
    ///
    /// Moving a draft within the same day never trips the daily limit, and
    /// moving one never changes the total.
    async fn validate_scheduled_limits(
        &self,
        account_id: &str,
        scheduled_at: DateTime<Utc>,
        previous: Option<DateTime<Utc>>,
    ) -> CourierResult<()> {
        if previous.is_some_and(|p| p.date_naive() == scheduled_at.date_naive()) {
            return Ok(());
        }

        let drafts = self.ctx.db.scheduled_statuses_of(account_id).await?;

        let max_daily = self.ctx.config.scheduled.max_daily;
        let daily = drafts
            .iter()
            .filter(|d| d.scheduled_at.date_naive() == scheduled_at.date_naive())
            .count();
        if daily >= max_daily {
            return Err(CourierError::Unprocessable(format!(
                "scheduled statuses count for day is at the limit ({})",
                max_daily
            )));
        }

        if previous.is_some() {
            return Ok(());
        }

        let max_total = self.ctx.config.scheduled.max_total;
        if drafts.len() >= max_total {
            return Err(CourierError::Unprocessable(format!(
                "total scheduled statuses count is at the limit ({})",
                max_total
            )));
        }

        Ok(())
    }
}
