/// Thread mutes
use super::StatusProcessor;
use crate::error::{CourierError, CourierResult};
use crate::model::{new_id, Account, Status, ThreadMute};
use chrono::Utc;

impl StatusProcessor {
    /// Resolve the thread a visible status (or the status it boosts) is in
    async fn visible_thread(&self, requester: &Account, status_id: &str) -> CourierResult<String> {
        let mut status: Status = self.get_visible_status(Some(requester), status_id).await?;
        if let Some(original) = status.boost_of_id.clone() {
            status = self.get_visible_status(Some(requester), &original).await?;
        }
        self.ctx.db.thread_id_of(&status).await
    }

    /// Stop notifications about the thread `status_id` belongs to
    ///
    /// Returns the id of the thread's top-level status.
    pub async fn mute_thread(&self, requester: &Account, status_id: &str) -> CourierResult<String> {
        let thread_id = self.visible_thread(requester, status_id).await?;

        let mute = ThreadMute {
            id: new_id(),
            account_id: requester.id.clone(),
            thread_id: thread_id.clone(),
            created_at: Utc::now(),
        };
        match self.ctx.db.insert_thread_mute(&mute).await {
            Ok(()) | Err(CourierError::Conflict(_)) => Ok(thread_id),
            Err(e) => Err(e),
        }
    }

    /// Resume notifications about the thread; a no-op when it is not muted
    pub async fn unmute_thread(&self, requester: &Account, status_id: &str) -> CourierResult<String> {
        let thread_id = self.visible_thread(requester, status_id).await?;
        self.ctx.db.delete_thread_mute(&requester.id, &thread_id).await?;
        Ok(thread_id)
    }
}
