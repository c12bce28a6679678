/// Local surfacing of side effects: notifications and stream events
///
/// Everything here only ever touches local accounts; remote targets are
/// skipped silently, so callers may pass any account in. Account mutes keep
/// a muted author's statuses off the muter's streams; notifications are
/// dropped for notifying account mutes and for muted threads.
use crate::context::AppContext;
use crate::error::CourierResult;
use crate::model::{new_id, Account, Notification, NotificationType, Poll, Status};
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct Surface {
    ctx: AppContext,
}

/// Lock key making the existence check and insert of one notification atomic
fn notify_lock_key(
    kind: NotificationType,
    target: &Account,
    origin: &Account,
    status_id: Option<&str>,
) -> String {
    let mut key = format!(
        "notification:?type={}&targetAcct={}&originAcct={}",
        kind.as_str(),
        target.uri,
        origin.uri
    );
    if let Some(id) = status_id {
        key.push_str("&statusOrEditID=");
        key.push_str(id);
    }
    key
}

impl Surface {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Store and stream a notification unless an identical one exists
    ///
    /// Returns whether a new notification was created. Nothing is created
    /// when `target` muted `origin`'s notifications, or the thread of the
    /// status `status_id` names.
    pub async fn notify(
        &self,
        kind: NotificationType,
        target: &Account,
        origin: &Account,
        status_id: Option<&str>,
    ) -> CourierResult<bool> {
        if target.is_remote() || target.id == origin.id {
            return Ok(false);
        }

        if self.notifications_muted(target, origin).await? {
            debug!(kind = kind.as_str(), target = %target.id, origin = %origin.id, "Origin muted");
            return Ok(false);
        }

        if let Some(id) = status_id {
            if let Some(status) = self.ctx.db.get_status(id).await? {
                if self.thread_muted(target, &status).await? {
                    debug!(kind = kind.as_str(), target = %target.id, status = %id, "Thread muted");
                    return Ok(false);
                }
            }
        }

        self.put_notification(kind, target, origin, status_id).await
    }

    async fn notifications_muted(&self, target: &Account, origin: &Account) -> CourierResult<bool> {
        Ok(self
            .ctx
            .db
            .get_user_mute(&target.id, &origin.id)
            .await?
            .is_some_and(|m| m.notifications && m.is_active(Utc::now())))
    }

    async fn thread_muted(&self, target: &Account, status: &Status) -> CourierResult<bool> {
        let thread_id = self.ctx.db.thread_id_of(status).await?;
        self.ctx.db.is_thread_muted(&target.id, &thread_id).await
    }

    async fn put_notification(
        &self,
        kind: NotificationType,
        target: &Account,
        origin: &Account,
        status_id: Option<&str>,
    ) -> CourierResult<bool> {
        let guard = self
            .ctx
            .locks
            .lock(&notify_lock_key(kind, target, origin, status_id))
            .await;

        if self
            .ctx
            .db
            .get_notification(kind, &target.id, &origin.id, status_id)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let notification = Notification {
            id: new_id(),
            notification_type: kind,
            target_account_id: target.id.clone(),
            origin_account_id: origin.id.clone(),
            status_id: status_id.map(str::to_string),
            created_at: Utc::now(),
        };
        if !self.ctx.db.insert_notification(&notification).await? {
            return Ok(false);
        }

        guard.unlock();

        self.ctx.streams.notify(&notification);
        debug!(kind = kind.as_str(), target = %target.id, origin = %origin.id, "Notified");
        Ok(true)
    }

    /// Local accounts that should see `status` on their timelines
    ///
    /// The author, local followers and locally mentioned accounts, each
    /// filtered through visibility. Accounts muting the author, or the
    /// boosted author of a boost, are left out.
    pub async fn local_audience(&self, status: &Status) -> CourierResult<Vec<Account>> {
        let mut authors = vec![status.account_id.clone()];
        if let Some(original_id) = &status.boost_of_id {
            if let Some(original) = self.ctx.db.get_status(original_id).await? {
                authors.push(original.account_id);
            }
        }

        let mut candidates = vec![status.account_id.clone()];
        candidates.extend(
            self.ctx
                .db
                .followers_of(&status.account_id)
                .await?
                .into_iter()
                .map(|f| f.account_id),
        );
        candidates.extend(status.mention_ids.iter().cloned());

        let mut seen = HashSet::new();
        let mut audience = Vec::new();
        for id in candidates {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some(account) = self.ctx.db.get_account(&id).await? else {
                continue;
            };
            if account.is_remote() || self.mutes_any(&account, &authors).await? {
                continue;
            }
            if self.ctx.visibility.is_visible(Some(&account), status).await? {
                audience.push(account);
            }
        }

        Ok(audience)
    }

    async fn mutes_any(&self, account: &Account, authors: &[String]) -> CourierResult<bool> {
        let now = Utc::now();
        for author in authors.iter().filter(|a| **a != account.id) {
            if let Some(mute) = self.ctx.db.get_user_mute(&account.id, author).await? {
                if mute.is_active(now) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Stream a new status to its audience and notify mentioned accounts
    ///
    /// A boost notifies the boosted status' author instead.
    pub async fn timeline_and_notify_status(&self, status: &Status, author: &Account) -> CourierResult<()> {
        for account in self.local_audience(status).await? {
            self.ctx.streams.update(&account.id, status);
        }

        if let Some(original_id) = &status.boost_of_id {
            if let Some(original) = self.ctx.db.get_status(original_id).await? {
                if let Some(original_author) = self.ctx.db.get_account(&original.account_id).await? {
                    self.notify(NotificationType::Reblog, &original_author, author, Some(&original.id))
                        .await?;
                }
            }
            return Ok(());
        }

        let mut mentioned: Vec<&str> = status.mention_ids.iter().map(String::as_str).collect();
        if let Some(replied_to) = status.in_reply_to_account_id.as_deref() {
            if !mentioned.contains(&replied_to) {
                mentioned.push(replied_to);
            }
        }

        for id in mentioned {
            let Some(account) = self.ctx.db.get_account(id).await? else {
                continue;
            };
            if !self.ctx.visibility.is_visible(Some(&account), status).await? {
                continue;
            }
            self.notify(NotificationType::Mention, &account, author, Some(&status.id))
                .await?;
        }

        Ok(())
    }

    /// Stream an edited status and tell everyone who interacted with it
    pub async fn timeline_and_notify_status_update(
        &self,
        status: &Status,
        author: &Account,
    ) -> CourierResult<()> {
        for account in self.local_audience(status).await? {
            self.ctx.streams.status_update(&account.id, status);
        }

        // Keyed on the latest edit so every edit notifies once
        let edit_id = self
            .ctx
            .db
            .get_status_edits(&status.id)
            .await?
            .pop()
            .map(|e| e.id)
            .unwrap_or_else(|| status.id.clone());

        for account in self.interacting_accounts(status).await? {
            // Keyed on the edit, so the status' thread is checked here
            if self.thread_muted(&account, status).await? {
                continue;
            }
            self.notify(NotificationType::Update, &account, author, Some(&edit_id))
                .await?;
        }

        Ok(())
    }

    /// Tell voters and the author that a poll ended
    pub async fn notify_poll_close(&self, poll: &Poll, status: &Status, author: &Account) -> CourierResult<()> {
        for vote in self.ctx.db.get_poll_votes(&poll.id).await? {
            match self.ctx.db.get_account(&vote.account_id).await? {
                Some(voter) => {
                    self.notify(NotificationType::Poll, &voter, author, Some(&status.id))
                        .await?;
                }
                None => warn!(poll = %poll.id, voter = %vote.account_id, "Voter missing"),
            }
        }

        // Authors get their own poll results too
        if author.is_local() {
            self.put_notification(NotificationType::Poll, author, author, Some(&status.id))
                .await?;
        }

        self.ctx.streams.status_update(&author.id, status);
        Ok(())
    }

    /// Remove a status from the streams of everyone who could see it
    pub async fn delete_status_from_timelines(&self, status: &Status) -> CourierResult<()> {
        for account in self.local_audience(status).await? {
            self.ctx.streams.delete(&account.id, &status.id);
        }
        Ok(())
    }

    /// Accounts that boosted, faved or voted on `status`
    async fn interacting_accounts(&self, status: &Status) -> CourierResult<Vec<Account>> {
        let mut ids: Vec<String> = Vec::new();
        ids.extend(self.ctx.db.boosts_of(&status.id).await?.into_iter().map(|b| b.account_id));
        ids.extend(
            self.ctx
                .db
                .faves_of_status(&status.id)
                .await?
                .into_iter()
                .map(|f| f.account_id),
        );
        if let Some(poll_id) = &status.poll_id {
            ids.extend(
                self.ctx
                    .db
                    .get_poll_votes(poll_id)
                    .await?
                    .into_iter()
                    .map(|v| v.account_id),
            );
        }

        let mut seen = HashSet::new();
        let mut accounts = Vec::new();
        for id in ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(account) = self.ctx.db.get_account(&id).await? {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }
}
