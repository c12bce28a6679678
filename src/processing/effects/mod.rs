/// Side-effect handlers bound to the worker pools
///
/// [`ClientApiHandler`] consumes local-origin messages and is the only
/// place that federates. [`FediApiHandler`] consumes messages produced by
/// inbound federation and only ever surfaces them locally.
///
/// A handler runs every effect of a message even when an earlier one
/// fails, then reports the first failure to the worker for logging.

pub mod federate;
pub mod from_client_api;
pub mod from_fedi_api;
pub mod surface;

pub use federate::Federate;
pub use from_client_api::ClientApiHandler;
pub use from_fedi_api::FediApiHandler;
pub use surface::Surface;

use crate::context::AppContext;
use crate::error::{CourierError, CourierResult};
use crate::messages::Message;
use crate::model::{Account, Status};
use tracing::warn;

/// First failure among a message's effects
#[derive(Default)]
pub(crate) struct Outcome {
    first_error: Option<CourierError>,
}

impl Outcome {
    pub fn record<T>(&mut self, effect: &'static str, result: CourierResult<T>) {
        if let Err(e) = result {
            warn!(effect, "Side effect failed: {}", e);
            self.first_error.get_or_insert(e);
        }
    }

    pub fn finish(self) -> CourierResult<()> {
        match self.first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub(crate) fn unhandled(msg: &Message) -> CourierError {
    CourierError::Internal(format!(
        "no handler for {} {}",
        msg.activity_type(),
        msg.object_type()
    ))
}

/// Count a new status against its author, under the author's lock
pub(crate) async fn increment_statuses_count(
    ctx: &AppContext,
    author: &Account,
    status: &Status,
) -> CourierResult<()> {
    let _guard = ctx.locks.lock(&author.uri).await;

    let Some(mut account) = ctx.db.get_account(&author.id).await? else {
        return Ok(());
    };
    account.statuses_count += 1;
    account.last_status_at = Some(status.created_at);
    ctx.db.update_account(&account).await
}

/// Undo the counts a status contributed to its author
pub(crate) async fn decrement_statuses_count(
    ctx: &AppContext,
    author: &Account,
    status: &Status,
) -> CourierResult<()> {
    let _guard = ctx.locks.lock(&author.uri).await;

    let Some(mut account) = ctx.db.get_account(&author.id).await? else {
        return Ok(());
    };
    account.statuses_count = (account.statuses_count - 1).max(0);
    if status.pinned_at.is_some() {
        account.pinned_count = (account.pinned_count - 1).max(0);
    }
    ctx.db.update_account(&account).await
}
