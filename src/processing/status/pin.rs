/// Pinning statuses to the author's profile
use super::StatusProcessor;
use crate::error::{CourierError, CourierResult};
use crate::model::{Account, Status, Visibility};
use chrono::Utc;
use tracing::debug;

impl StatusProcessor {
    /// Pin one of `requester`'s statuses
    ///
    /// The account's pinned count is read and written under the account lock.
    pub async fn pin(&self, requester: &Account, status_id: &str) -> CourierResult<Status> {
        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let mut account = self.reload_account(requester).await?;
        let mut status = self.get_own_status(requester, status_id).await?;

        if status.visibility == Visibility::Direct {
            return Err(CourierError::Unprocessable(
                "cannot pin a direct status".to_string(),
            ));
        }

        if status.pinned_at.is_some() {
            return Err(CourierError::Unprocessable("status already pinned".to_string()));
        }

        let max = self.ctx.config.statuses.max_pinned;
        if account.pinned_count >= max as i64 {
            return Err(CourierError::Unprocessable(format!(
                "status pin limit exceeded, you've already pinned {} status(es) out of {}",
                account.pinned_count, max
            )));
        }

        status.pinned_at = Some(Utc::now());
        self.ctx.db.update_status(&status, &["pinned_at"]).await?;

        account.pinned_count += 1;
        self.ctx.db.update_account(&account).await?;

        debug!(status = %status.id, pinned = account.pinned_count, "Status pinned");
        Ok(status)
    }

    /// Unpin a status; unpinning a status that is not pinned is a no-op
    pub async fn unpin(&self, requester: &Account, status_id: &str) -> CourierResult<Status> {
        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let mut account = self.reload_account(requester).await?;
        let mut status = self.get_own_status(requester, status_id).await?;

        if status.pinned_at.is_none() {
            return Ok(status);
        }

        status.pinned_at = None;
        self.ctx.db.update_status(&status, &["pinned_at"]).await?;

        account.pinned_count = (account.pinned_count - 1).max(0);
        self.ctx.db.update_account(&account).await?;

        Ok(status)
    }

    async fn reload_account(&self, account: &Account) -> CourierResult<Account> {
        self.ctx
            .db
            .get_account(&account.id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("account {}", account.id)))
    }
}
