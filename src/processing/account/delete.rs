/// Account deletion
///
/// Deletion is requested synchronously (the account is suspended and a
/// `Delete Person` message queued); the cascade itself runs in the
/// handler. Each cleanup step is attempted regardless of earlier
/// failures and nothing is rolled back, so a partial deletion can be
/// finished by running the cascade again.
use super::AccountProcessor;
use crate::error::{CourierError, CourierResult};
use crate::messages::{ActivityType, Message, Payload};
use crate::model::Account;
use crate::processing::polls::poll_lock_key;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{error, info, warn};

/// Cleanup steps, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanupStep {
    Statuses,
    Relationships,
    Notifications,
    Bookmarks,
    Faves,
    PollVotes,
    ScheduledStatuses,
    Media,
    Account,
}

impl CleanupStep {
    pub const ALL: [CleanupStep; 9] = [
        CleanupStep::Statuses,
        CleanupStep::Relationships,
        CleanupStep::Notifications,
        CleanupStep::Bookmarks,
        CleanupStep::Faves,
        CleanupStep::PollVotes,
        CleanupStep::ScheduledStatuses,
        CleanupStep::Media,
        CleanupStep::Account,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleanupStep::Statuses => "statuses",
            CleanupStep::Relationships => "relationships",
            CleanupStep::Notifications => "notifications",
            CleanupStep::Bookmarks => "bookmarks",
            CleanupStep::Faves => "faves",
            CleanupStep::PollVotes => "poll_votes",
            CleanupStep::ScheduledStatuses => "scheduled_statuses",
            CleanupStep::Media => "media",
            CleanupStep::Account => "account",
        }
    }
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: CleanupStep,
    /// Rows (or statuses) removed
    pub affected: u64,
    /// Set when the step failed, possibly after removing some rows
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub account_id: String,
    pub steps: Vec<StepOutcome>,
}

impl DeletionReport {
    pub fn failed_steps(&self) -> Vec<CleanupStep> {
        self.steps
            .iter()
            .filter(|s| s.error.is_some())
            .map(|s| s.step)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }
}

impl AccountProcessor {
    /// Suspend `requester` and queue the deletion cascade
    pub async fn request_delete(&self, requester: &Account) -> CourierResult<()> {
        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let mut account = self.get_account(&requester.id).await?;
        if account.is_suspended() {
            return Err(CourierError::Unprocessable(
                "account deletion already in progress".to_string(),
            ));
        }

        account.suspended_at = Some(Utc::now());
        self.ctx.db.update_account(&account).await?;

        info!(account = %account.id, "Account deletion requested");

        self.ctx.workers.route(Message::new(
            ActivityType::Delete,
            Payload::Account(Box::new(account.clone())),
            account,
        ));

        Ok(())
    }

    /// Remove everything the account owns, then the account itself
    ///
    /// Statuses are deleted one by one through the inline `process` path
    /// so their own side effects (streams, stats, federation) run before
    /// the account row disappears.
    pub async fn delete_cascade(&self, account: &Account) -> DeletionReport {
        let mut steps = Vec::with_capacity(CleanupStep::ALL.len());

        for step in CleanupStep::ALL {
            let (affected, error) = match self.run_step(step, account).await {
                Ok(affected) => (affected, None),
                Err((affected, e)) => {
                    error!(account = %account.id, %step, "Cleanup step failed: {}", e);
                    (affected, Some(e.to_string()))
                }
            };
            steps.push(StepOutcome {
                step,
                affected,
                error,
            });
        }

        let report = DeletionReport {
            account_id: account.id.clone(),
            steps,
        };
        if report.is_complete() {
            info!(account = %account.id, "Account deleted");
        } else {
            warn!(
                account = %account.id,
                failed = ?report.failed_steps(),
                "Account deletion incomplete"
            );
        }
        report
    }

    async fn run_step(
        &self,
        step: CleanupStep,
        account: &Account,
    ) -> Result<u64, (u64, CourierError)> {
        let db = &self.ctx.db;
        let whole = |r: CourierResult<u64>| r.map_err(|e| (0, e));

        match step {
            CleanupStep::Statuses => self.delete_statuses(account).await,
            CleanupStep::Relationships => whole(db.delete_relationships_of(&account.id).await),
            CleanupStep::Notifications => whole(db.delete_notifications_of(&account.id).await),
            CleanupStep::Bookmarks => whole(db.delete_bookmarks_of(&account.id).await),
            CleanupStep::Faves => whole(db.delete_faves_of(&account.id).await),
            CleanupStep::PollVotes => self.delete_poll_votes(account).await,
            CleanupStep::ScheduledStatuses => self.delete_scheduled_statuses(account).await,
            CleanupStep::Media => whole(db.delete_media_by_account(&account.id).await),
            CleanupStep::Account => whole(db.delete_account(&account.id).await.map(u64::from)),
        }
    }

    async fn delete_statuses(&self, account: &Account) -> Result<u64, (u64, CourierError)> {
        let statuses = self
            .ctx
            .db
            .statuses_by_account(&account.id)
            .await
            .map_err(|e| (0, e))?;

        let mut deleted = 0;
        let mut first_error = None;
        for status in statuses {
            let status_id = status.id.clone();
            let msg = Message::new(
                ActivityType::Delete,
                Payload::Status(Box::new(status)),
                account.clone(),
            );
            match self.ctx.workers.process(msg).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(account = %account.id, status = %status_id, "Error deleting status: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err((deleted, e)),
            None => Ok(deleted),
        }
    }

    /// Withdraw the account's votes from polls that are still around
    async fn delete_poll_votes(&self, account: &Account) -> Result<u64, (u64, CourierError)> {
        let votes = self
            .ctx
            .db
            .poll_votes_by_account(&account.id)
            .await
            .map_err(|e| (0, e))?;

        let mut deleted = 0;
        for vote in votes {
            let _guard = self.ctx.locks.lock(&poll_lock_key(&vote.poll_id)).await;

            let result: CourierResult<()> = async {
                if let Some(mut poll) = self.ctx.db.get_poll(&vote.poll_id).await? {
                    poll.decrement_votes(&vote.choices);
                    self.ctx.db.update_poll(&poll).await?;
                }
                self.ctx.db.delete_poll_vote(&vote.id).await
            }
            .await;

            result.map_err(|e| (deleted, e))?;
            deleted += 1;
        }

        Ok(deleted)
    }

    async fn delete_scheduled_statuses(&self, account: &Account) -> Result<u64, (u64, CourierError)> {
        let drafts = self
            .ctx
            .db
            .scheduled_statuses_of(&account.id)
            .await
            .map_err(|e| (0, e))?;

        let mut deleted = 0;
        for draft in drafts {
            self.ctx.workers.scheduler.cancel(&draft.id);
            self.ctx
                .db
                .delete_scheduled_status(&draft.id)
                .await
                .map_err(|e| (deleted, e))?;
            deleted += 1;
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{new_id, Bookmark, PollRequest, StatusCreateRequest};
    use crate::processing::testing::TestEnv;
    use chrono::Duration;

    #[tokio::test]
    async fn test_request_delete_suspends_and_queues() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;

        env.processor.account.request_delete(&alice).await.unwrap();

        let stored = env.ctx.db.get_account(&alice.id).await.unwrap().unwrap();
        assert!(stored.is_suspended());
        let msgs = env.drain_client();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].activity_type(), ActivityType::Delete);

        let err = env.processor.account.request_delete(&alice).await.unwrap_err();
        assert!(matches!(err, CourierError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn test_cascade_removes_everything() {
        let env = TestEnv::started().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;

        let poll_status = env
            .processor
            .status
            .create(
                &bob,
                StatusCreateRequest {
                    status: "vote".to_string(),
                    poll: Some(PollRequest {
                        options: vec!["a".into(), "b".into()],
                        expires_in: 3600,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let poll_id = poll_status.poll_id.clone().unwrap();
        env.processor.polls.vote(&alice, &poll_id, vec![1]).await.unwrap();

        let own = env.post(&alice, "bye").await;
        env.processor.status.fave(&alice, &poll_status.id).await.unwrap();
        env.follow(&alice, &bob).await;
        env.follow(&bob, &alice).await;
        env.ctx
            .db
            .insert_bookmark(&Bookmark {
                id: new_id(),
                account_id: alice.id.clone(),
                status_id: poll_status.id.clone(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let draft = env
            .processor
            .status
            .schedule(
                &alice,
                Utc::now() + Duration::hours(2),
                StatusCreateRequest {
                    status: "never".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        env.settle().await;

        let report = env.processor.account.delete_cascade(&alice).await;
        assert!(report.is_complete(), "{:?}", report);
        assert_eq!(
            report.steps.iter().map(|s| s.step).collect::<Vec<_>>(),
            CleanupStep::ALL.to_vec()
        );

        let db = &env.ctx.db;
        assert!(db.get_account(&alice.id).await.unwrap().is_none());
        assert!(db.get_status(&own.id).await.unwrap().is_none());
        assert!(db.followers_of(&bob.id).await.unwrap().is_empty());
        assert!(db.following_of(&bob.id).await.unwrap().is_empty());
        assert!(db.faves_of_status(&poll_status.id).await.unwrap().is_empty());
        assert!(db.bookmarkers_of(&poll_status.id).await.unwrap().is_empty());
        assert!(db.get_scheduled_status(&draft.id).await.unwrap().is_none());
        assert!(!env.ctx.workers.scheduler.is_pending(&draft.id));

        let poll = db.get_poll(&poll_id).await.unwrap().unwrap();
        assert_eq!(poll.votes, vec![0, 0]);
        assert_eq!(poll.voters, 0);

        env.processor.stop().await;
    }

    #[tokio::test]
    async fn test_cascade_reports_failed_step_and_continues() {
        let env = TestEnv::started().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        env.follow(&alice, &bob).await;
        env.processor
            .status
            .schedule(
                &alice,
                Utc::now() + Duration::hours(2),
                StatusCreateRequest {
                    status: "stuck".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        sqlx::query("DROP TABLE scheduled_statuses")
            .execute(env.ctx.db.pool())
            .await
            .unwrap();

        let report = env.processor.account.delete_cascade(&alice).await;
        assert_eq!(report.failed_steps(), vec![CleanupStep::ScheduledStatuses]);
        assert!(!report.is_complete());

        // Later steps still ran
        assert!(env.ctx.db.get_account(&alice.id).await.unwrap().is_none());
        let relationships = report
            .steps
            .iter()
            .find(|s| s.step == CleanupStep::Relationships)
            .unwrap();
        assert_eq!(relationships.affected, 1);

        env.processor.stop().await;
    }
}
