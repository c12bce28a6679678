/// Account operations: relationships, mutes, interaction policies, deletion and moves
///
/// Relationship writes happen under the requester's URI lock, so the
/// "already following?" check and the insert are one step for concurrent
/// requests from the same account. The store's unique constraints catch
/// anything that still slips past (e.g. the remote side racing in).

pub mod block;
pub mod delete;
pub mod follow;
pub mod moved;
pub mod mute;
pub mod policy;

use crate::context::AppContext;
use crate::error::{CourierError, CourierResult};
use crate::model::Account;
use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use delete::{CleanupStep, DeletionReport, StepOutcome};

/// How the requester and a target account relate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub following: bool,
    pub requested: bool,
    pub followed_by: bool,
    pub blocking: bool,
    pub blocked_by: bool,
    pub muting: bool,
    pub muting_notifications: bool,
}

#[derive(Clone)]
pub struct AccountProcessor {
    ctx: AppContext,
}

impl AccountProcessor {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn relationship(&self, requester: &Account, target_id: &str) -> CourierResult<Relationship> {
        let db = &self.ctx.db;
        let mute = db
            .get_user_mute(&requester.id, target_id)
            .await?
            .filter(|m| m.is_active(Utc::now()));
        Ok(Relationship {
            id: target_id.to_string(),
            following: db.get_follow(&requester.id, target_id).await?.is_some(),
            requested: db.get_follow_request(&requester.id, target_id).await?.is_some(),
            followed_by: db.get_follow(target_id, &requester.id).await?.is_some(),
            blocking: db.get_block(&requester.id, target_id).await?.is_some(),
            blocked_by: db.get_block(target_id, &requester.id).await?.is_some(),
            muting: mute.is_some(),
            muting_notifications: mute.is_some_and(|m| m.notifications),
        })
    }

    pub(crate) async fn get_account(&self, id: &str) -> CourierResult<Account> {
        self.ctx
            .db
            .get_account(id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("account {}", id)))
    }
}
