/// Status operations: create, edit, delete, pin, faves, boosts, thread mutes and drafts
///
/// Each operation commits its own write, then hands a message to the
/// workers for the side effects. Errors are returned before any message
/// is pushed.

pub mod content;
pub mod context;
pub mod create;
pub mod delete;
pub mod edit;
pub mod history;
pub mod interact;
pub mod mute;
pub mod pin;
pub mod scheduled;

use super::polls::PollProcessor;
use crate::context::AppContext;
use crate::error::{CourierError, CourierResult};
use crate::model::{Account, Status};

pub use context::ThreadContext;
pub use history::StatusRevision;

#[derive(Clone)]
pub struct StatusProcessor {
    ctx: AppContext,
    polls: PollProcessor,
}

impl StatusProcessor {
    pub fn new(ctx: AppContext, polls: PollProcessor) -> Self {
        Self { ctx, polls }
    }

    /// Load a status authored by `requester`, populated
    ///
    /// Another author's status and boosts both read as not found.
    pub(crate) async fn get_own_status(&self, requester: &Account, status_id: &str) -> CourierResult<Status> {
        let mut status = match self.ctx.db.get_status(status_id).await? {
            Some(status) if status.account_id == requester.id && !status.is_boost() => status,
            _ => return Err(CourierError::NotFound(format!("status {}", status_id))),
        };
        self.ctx.db.populate_status(&mut status).await?;
        Ok(status)
    }

    /// Load a status `requester` may see, populated
    pub(crate) async fn get_visible_status(
        &self,
        requester: Option<&Account>,
        status_id: &str,
    ) -> CourierResult<Status> {
        let not_found = || CourierError::NotFound(format!("status {}", status_id));

        let mut status = self.ctx.db.get_status(status_id).await?.ok_or_else(not_found)?;
        if !self.ctx.visibility.is_visible(requester, &status).await? {
            return Err(not_found());
        }

        self.ctx.db.populate_status(&mut status).await?;
        Ok(status)
    }

    pub(crate) async fn get_author(&self, status: &Status) -> CourierResult<Account> {
        self.ctx
            .db
            .get_account(&status.account_id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("account {}", status.account_id)))
    }
}

/// URI of a status authored by `account`
pub(crate) fn status_uri(account: &Account, status_id: &str) -> String {
    format!("{}/statuses/{}", account.uri, status_id)
}
