/// Poll voting, expiry scheduling and closing
use crate::context::AppContext;
use crate::error::{CourierError, CourierResult};
use crate::messages::{ActivityType, Message, Payload};
use crate::model::{new_id, Account, Poll, PollVote};
use crate::workers::ScheduledTask;
use chrono::Utc;
use tracing::{debug, error, info, warn};

/// Lock key serializing votes and closes of one poll
pub(crate) fn poll_lock_key(poll_id: &str) -> String {
    format!("poll:{}", poll_id)
}

#[derive(Clone)]
pub struct PollProcessor {
    ctx: AppContext,
}

impl PollProcessor {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Register the close task for a poll with an expiry
    pub fn schedule_expiry(&self, poll: &Poll) -> CourierResult<()> {
        let Some(expires_at) = poll.expires_at else {
            return Ok(());
        };

        if !self
            .ctx
            .workers
            .scheduler
            .add_once(ScheduledTask::close_poll(&poll.id, expires_at))
        {
            return Err(CourierError::Internal(format!(
                "failed adding poll {} to scheduler",
                poll.id
            )));
        }

        debug!(poll = %poll.id, %expires_at, "Scheduled poll expiry");
        Ok(())
    }

    /// Drop the pending close task, if any
    pub fn cancel_expiry(&self, poll_id: &str) -> bool {
        self.ctx.workers.scheduler.cancel(poll_id)
    }

    /// Close a poll whose expiry fired
    ///
    /// A poll that is gone or already closed is left alone.
    pub async fn close(&self, poll_id: &str) -> CourierResult<()> {
        let _guard = self.ctx.locks.lock(&poll_lock_key(poll_id)).await;

        let mut poll = match self.ctx.db.get_poll(poll_id).await? {
            Some(poll) if !poll.is_closed() => poll,
            _ => {
                debug!(poll = poll_id, "Poll missing or already closed");
                return Ok(());
            }
        };

        poll.closed_at = Some(Utc::now());
        self.ctx.db.update_poll(&poll).await?;

        let Some(mut status) = self.ctx.db.get_status(&poll.status_id).await? else {
            warn!(poll = poll_id, status = %poll.status_id, "Closed poll has no status");
            return Ok(());
        };
        self.ctx.db.populate_status(&mut status).await?;

        let author = self
            .ctx
            .db
            .get_account(&status.account_id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("account {}", status.account_id)))?;

        info!(poll = poll_id, status = %status.id, "Poll closed");

        self.ctx.workers.route(Message::new(
            ActivityType::Update,
            Payload::PollClosed {
                poll: Box::new(poll),
                status: Box::new(status),
            },
            author,
        ));

        Ok(())
    }

    /// Record `requester`'s choices on a poll
    pub async fn vote(
        &self,
        requester: &Account,
        poll_id: &str,
        choices: Vec<usize>,
    ) -> CourierResult<Poll> {
        let _guard = self.ctx.locks.lock(&poll_lock_key(poll_id)).await;

        let not_found = || CourierError::NotFound(format!("poll {}", poll_id));
        let mut poll = self.ctx.db.get_poll(poll_id).await?.ok_or_else(not_found)?;
        let status = self
            .ctx
            .db
            .get_status(&poll.status_id)
            .await?
            .ok_or_else(not_found)?;

        if !self.ctx.visibility.is_visible(Some(requester), &status).await? {
            return Err(not_found());
        }

        if status.account_id == requester.id {
            return Err(CourierError::Unprocessable(
                "cannot vote in own poll".to_string(),
            ));
        }

        if poll.is_closed() || poll.is_expired(Utc::now()) {
            return Err(CourierError::Unprocessable("poll has already ended".to_string()));
        }

        validate_choices(&poll, &choices)?;

        let voted = self
            .ctx
            .db
            .get_poll_votes(poll_id)
            .await?
            .iter()
            .any(|v| v.account_id == requester.id);
        if voted {
            return Err(CourierError::Conflict("already voted in poll".to_string()));
        }

        let vote = PollVote {
            id: new_id(),
            poll_id: poll.id.clone(),
            account_id: requester.id.clone(),
            choices,
            created_at: Utc::now(),
        };
        self.ctx.db.insert_poll_vote(&vote).await?;

        poll.increment_votes(&vote.choices);
        self.ctx.db.update_poll(&poll).await?;

        let mut msg = Message::new(
            ActivityType::Create,
            Payload::PollVote(vote),
            requester.clone(),
        );
        if let Some(author) = self.ctx.db.get_account(&status.account_id).await? {
            msg = msg.with_target(author);
        }
        self.ctx.workers.route(msg);

        Ok(poll)
    }

    /// Register every open poll with an expiry, closing those already past it
    pub async fn schedule_all(&self) -> CourierResult<usize> {
        let now = Utc::now();
        let mut scheduled = 0;

        for poll in self.ctx.db.open_polls_with_expiry().await? {
            if poll.is_expired(now) {
                if let Err(e) = self.close(&poll.id).await {
                    error!(poll = %poll.id, "Failed closing expired poll: {}", e);
                }
                continue;
            }

            match self.schedule_expiry(&poll) {
                Ok(()) => scheduled += 1,
                Err(e) => error!(poll = %poll.id, "Failed scheduling poll expiry: {}", e),
            }
        }

        info!(scheduled, "Scheduled poll expiries");
        Ok(scheduled)
    }
}

fn validate_choices(poll: &Poll, choices: &[usize]) -> CourierResult<()> {
    if choices.is_empty() {
        return Err(CourierError::Validation("no choices given".to_string()));
    }

    if !poll.multiple && choices.len() > 1 {
        return Err(CourierError::Validation(
            "poll only allows a single choice".to_string(),
        ));
    }

    for (i, choice) in choices.iter().enumerate() {
        if *choice >= poll.options.len() {
            return Err(CourierError::Validation(format!("invalid choice {}", choice)));
        }
        if choices[..i].contains(choice) {
            return Err(CourierError::Validation(format!("duplicate choice {}", choice)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::db::status::tests::note;
    use crate::db::Db;
    use crate::federation::LoggingFederator;
    use crate::model::StatusObjectType;
    use crate::workers::{TaskRunner, Worker};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Arc;

    struct NoopRunner;

    #[async_trait]
    impl TaskRunner for NoopRunner {
        async fn run(&self, _task: ScheduledTask) -> CourierResult<()> {
            Ok(())
        }
    }

    async fn setup() -> (PollProcessor, Account, Account, Poll) {
        let db = Db::in_memory().await.unwrap();
        let ctx = AppContext::with_parts(ServerConfig::default(), db, Arc::new(LoggingFederator));
        ctx.workers.scheduler.start(Arc::new(NoopRunner));

        let alice = Account::new_local("http://localhost", "alice");
        let bob = Account::new_local("http://localhost", "bob");
        ctx.db.insert_account(&alice).await.unwrap();
        ctx.db.insert_account(&bob).await.unwrap();

        let mut status = note(&alice, "pick one");
        let poll = Poll::new(
            &status.id,
            vec!["a".into(), "b".into(), "c".into()],
            false,
            false,
            Some(Utc::now() + Duration::hours(1)),
        );
        status.poll_id = Some(poll.id.clone());
        status.object_type = StatusObjectType::Question;
        ctx.db.insert_status(&status).await.unwrap();
        ctx.db.insert_poll(&poll).await.unwrap();

        (PollProcessor::new(ctx), alice, bob, poll)
    }

    fn client_queue(processor: &PollProcessor) -> &Worker {
        &processor.ctx.workers.client
    }

    #[tokio::test]
    async fn test_vote_counts_and_pushes_message() {
        let (processor, _alice, bob, poll) = setup().await;

        let updated = processor.vote(&bob, &poll.id, vec![1]).await.unwrap();
        assert_eq!(updated.votes, vec![0, 1, 0]);
        assert_eq!(updated.voters, 1);
        assert_eq!(client_queue(&processor).queue().len(), 1);

        let stored = processor.ctx.db.get_poll(&poll.id).await.unwrap().unwrap();
        assert_eq!(stored.votes, vec![0, 1, 0]);

        let err = processor.vote(&bob, &poll.id, vec![0]).await.unwrap_err();
        assert!(matches!(err, CourierError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_vote_rejections() {
        let (processor, alice, bob, poll) = setup().await;

        let err = processor.vote(&alice, &poll.id, vec![0]).await.unwrap_err();
        assert!(matches!(err, CourierError::Unprocessable(_)));

        for choices in [vec![], vec![0, 1], vec![9]] {
            let err = processor.vote(&bob, &poll.id, choices).await.unwrap_err();
            assert!(matches!(err, CourierError::Validation(_)));
        }

        processor.close(&poll.id).await.unwrap();
        let err = processor.vote(&bob, &poll.id, vec![0]).await.unwrap_err();
        assert!(matches!(err, CourierError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (processor, _alice, _bob, poll) = setup().await;

        processor.close(&poll.id).await.unwrap();
        let closed = processor.ctx.db.get_poll(&poll.id).await.unwrap().unwrap();
        assert!(closed.is_closed());
        assert_eq!(client_queue(&processor).queue().len(), 1);

        processor.close(&poll.id).await.unwrap();
        processor.close("missing").await.unwrap();
        assert_eq!(client_queue(&processor).queue().len(), 1);
    }

    #[tokio::test]
    async fn test_schedule_all_closes_expired_polls() {
        let (processor, _alice, _bob, poll) = setup().await;

        let mut expired = Poll::new(
            "other-status",
            vec!["x".into(), "y".into()],
            false,
            false,
            Some(Utc::now() - Duration::minutes(1)),
        );
        expired.status_id = "missing".to_string();
        processor.ctx.db.insert_poll(&expired).await.unwrap();

        assert_eq!(processor.schedule_all().await.unwrap(), 1);
        assert!(processor.ctx.workers.scheduler.is_pending(&poll.id));
        let closed = processor.ctx.db.get_poll(&expired.id).await.unwrap().unwrap();
        assert!(closed.is_closed());

        // Already registered
        assert!(processor.schedule_expiry(&poll).is_err());
    }
}
