/// Account moves (migration to another actor)
use super::AccountProcessor;
use crate::error::{CourierError, CourierResult};
use crate::messages::{AccountMove, ActivityType, Message, Payload};
use crate::model::Account;
use tracing::{info, warn};

impl AccountProcessor {
    /// Move `requester` to the account at `target_uri`
    ///
    /// The target must already be known and list `requester` in its
    /// `also_known_as`. Repeating a move to the same target re-sends it.
    pub async fn move_account(&self, requester: &Account, target_uri: &str) -> CourierResult<Account> {
        if !(target_uri.starts_with("https://") || target_uri.starts_with("http://")) {
            return Err(CourierError::Validation(
                "invalid moved_to_uri: scheme must be http(s)".to_string(),
            ));
        }

        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let mut origin = self.get_account(&requester.id).await?;
        let target = self
            .ctx
            .db
            .get_account_by_uri(target_uri)
            .await?
            .ok_or_else(|| {
                CourierError::Unprocessable(format!("target account {} is not known", target_uri))
            })?;

        check_move(&origin, &target)?;

        origin.moved_to_uri = Some(target.uri.clone());
        self.ctx.db.update_account(&origin).await?;

        info!(origin = %origin.uri, target = %target.uri, "Account moved");

        self.ctx.workers.route(
            Message::new(
                ActivityType::Move,
                Payload::Move(AccountMove {
                    origin_uri: origin.uri.clone(),
                    target_uri: target.uri.clone(),
                }),
                origin.clone(),
            )
            .with_target(target),
        );

        Ok(origin)
    }

    /// Point every local follower of `origin` at `target` instead
    ///
    /// Failures for one follower are logged and do not stop the others.
    pub(crate) async fn redirect_followers(&self, origin: &Account, target: &Account) -> CourierResult<usize> {
        let mut redirected = 0;

        for follow in self.ctx.db.followers_of(&origin.id).await? {
            let Some(follower) = self.ctx.db.get_account(&follow.account_id).await? else {
                continue;
            };
            if follower.is_remote() || follower.id == target.id {
                continue;
            }

            if let Err(e) = self.follow(&follower, &target.id).await {
                warn!(follower = %follower.id, target = %target.uri, "Could not follow move target: {}", e);
                continue;
            }
            if let Err(e) = self.unfollow(&follower, &origin.id).await {
                warn!(follower = %follower.id, origin = %origin.uri, "Could not unfollow moved account: {}", e);
                continue;
            }
            redirected += 1;
        }

        info!(origin = %origin.uri, target = %target.uri, redirected, "Followers redirected");
        Ok(redirected)
    }
}

/// Whether `origin` may move to `target`
pub(crate) fn check_move(origin: &Account, target: &Account) -> CourierResult<()> {
    if origin.id == target.id {
        return Err(CourierError::Unprocessable("cannot move to self".to_string()));
    }

    if target.is_suspended() {
        return Err(CourierError::Unprocessable(format!(
            "target account {} is suspended",
            target.uri
        )));
    }

    if let Some(moved_to) = &origin.moved_to_uri {
        if moved_to != &target.uri {
            return Err(CourierError::Unprocessable(format!(
                "account has already moved to {}; cannot also move to {}",
                moved_to, target.uri
            )));
        }
    }

    if !target.also_known_as.contains(&origin.uri) {
        return Err(CourierError::Unprocessable(format!(
            "target account {} is not aliased to this account via alsoKnownAs",
            target.uri
        )));
    }

    if let Some(moved_to) = &target.moved_to_uri {
        return Err(CourierError::Unprocessable(format!(
            "target account {} has already moved to {}",
            target.uri, moved_to
        )));
    }

    Ok(())
}
