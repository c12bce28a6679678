/// Side effects of mutations made by local accounts
use super::{
    decrement_statuses_count, increment_statuses_count, unhandled, Federate, Outcome, Surface,
};
use crate::error::{CourierError, CourierResult};
use crate::messages::{AccountMove, ActivityType, Message, Payload};
use crate::model::{Account, Fave, NotificationType, Poll, PollVote, Status};
use crate::processing::Processor;
use crate::workers::MessageHandler;
use async_trait::async_trait;
use tracing::{debug, warn};

pub struct ClientApiHandler {
    processor: Processor,
    surface: Surface,
    federate: Federate,
}

impl ClientApiHandler {
    pub fn new(processor: Processor) -> Self {
        let surface = Surface::new(processor.ctx.clone());
        let federate = Federate::new(processor.ctx.clone());
        Self {
            processor,
            surface,
            federate,
        }
    }
}

#[async_trait]
impl MessageHandler for ClientApiHandler {
    async fn handle(&self, msg: &Message) -> CourierResult<()> {
        debug!(message = %msg, "Processing client message");

        match (msg.activity_type(), msg.payload()) {
            (ActivityType::Create, Payload::Status(status)) => self.create_status(msg, status).await,
            (ActivityType::Create, Payload::Boost(boost)) => self.create_boost(msg, boost).await,
            (ActivityType::Create, Payload::Follow(_)) => self.create_follow(msg).await,
            (ActivityType::Create, Payload::FollowRequest(_)) => self.create_follow_request(msg).await,
            (ActivityType::Create, Payload::Fave(fave)) => self.create_fave(msg, fave).await,
            (ActivityType::Create, Payload::Block(_)) => self.federate.federate(msg).await,
            (ActivityType::Create, Payload::PollVote(vote)) => self.create_poll_vote(msg, vote).await,

            (ActivityType::Update, Payload::Status(status)) => self.update_status(msg, status).await,
            (ActivityType::Update, Payload::PollClosed { poll, status }) => {
                self.close_poll(msg, poll, status).await
            }
            (ActivityType::Update, Payload::Account(_)) => self.federate.federate(msg).await,

            (ActivityType::Accept, Payload::Follow(_)) => self.accept_follow(msg).await,
            (ActivityType::Reject, Payload::FollowRequest(_)) => self.federate.federate(msg).await,

            (ActivityType::Undo, Payload::Boost(boost)) => self.undo_boost(msg, boost).await,
            (
                ActivityType::Undo,
                Payload::Follow(_) | Payload::FollowRequest(_) | Payload::Block(_) | Payload::Fave(_),
            ) => self.federate.federate(msg).await,

            (ActivityType::Delete, Payload::Status(status)) => self.delete_status(msg, status).await,
            (ActivityType::Delete, Payload::Account(account)) => self.delete_account(msg, account).await,

            (ActivityType::Move, Payload::Move(mv)) => self.move_account(msg, mv).await,

            _ => Err(unhandled(msg)),
        }
    }
}

impl ClientApiHandler {
    fn ctx(&self) -> &crate::context::AppContext {
        &self.processor.ctx
    }

    async fn create_status(&self, msg: &Message, status: &Status) -> CourierResult<()> {
        let mut outcome = Outcome::default();
        outcome.record(
            "statuses_count",
            increment_statuses_count(self.ctx(), msg.origin(), status).await,
        );
        outcome.record(
            "timeline",
            self.surface.timeline_and_notify_status(status, msg.origin()).await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    async fn create_boost(&self, msg: &Message, boost: &Status) -> CourierResult<()> {
        let mut outcome = Outcome::default();
        outcome.record(
            "statuses_count",
            increment_statuses_count(self.ctx(), msg.origin(), boost).await,
        );
        outcome.record(
            "timeline",
            self.surface.timeline_and_notify_status(boost, msg.origin()).await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    async fn create_follow(&self, msg: &Message) -> CourierResult<()> {
        let target = required_target(msg)?;
        let mut outcome = Outcome::default();
        outcome.record(
            "notify",
            self.surface
                .notify(NotificationType::Follow, target, msg.origin(), None)
                .await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    async fn create_follow_request(&self, msg: &Message) -> CourierResult<()> {
        let target = required_target(msg)?;
        let mut outcome = Outcome::default();
        outcome.record(
            "notify",
            self.surface
                .notify(NotificationType::FollowRequest, target, msg.origin(), None)
                .await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    async fn create_fave(&self, msg: &Message, fave: &Fave) -> CourierResult<()> {
        let target = required_target(msg)?;
        let mut outcome = Outcome::default();
        outcome.record(
            "notify",
            self.surface
                .notify(NotificationType::Favourite, target, msg.origin(), Some(&fave.status_id))
                .await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    /// A vote on a local poll is federated as an update of the poll's
    /// status by its author; a vote on a remote poll goes to the author.
    async fn create_poll_vote(&self, msg: &Message, vote: &PollVote) -> CourierResult<()> {
        let db = &self.ctx().db;
        let Some(poll) = db.get_poll(&vote.poll_id).await? else {
            warn!(poll = %vote.poll_id, "Voted poll vanished");
            return Ok(());
        };
        let Some(mut status) = db.get_status(&poll.status_id).await? else {
            return Ok(());
        };
        db.populate_status(&mut status).await?;

        if !status.local {
            return self.federate.federate(msg).await;
        }

        let author = required_target(msg)?;
        self.ctx().streams.status_update(&author.id, &status);
        let update = Message::new(
            ActivityType::Update,
            Payload::Status(Box::new(status)),
            author.clone(),
        );
        self.federate.federate(&update).await
    }

    async fn update_status(&self, msg: &Message, status: &Status) -> CourierResult<()> {
        let mut outcome = Outcome::default();
        outcome.record(
            "timeline",
            self.surface
                .timeline_and_notify_status_update(status, msg.origin())
                .await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    async fn close_poll(&self, msg: &Message, poll: &Poll, status: &Status) -> CourierResult<()> {
        let mut outcome = Outcome::default();
        outcome.record(
            "notify",
            self.surface.notify_poll_close(poll, status, msg.origin()).await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    /// `origin` accepted a follow from `target`
    async fn accept_follow(&self, msg: &Message) -> CourierResult<()> {
        let follower = required_target(msg)?;
        let mut outcome = Outcome::default();
        outcome.record(
            "notify",
            self.surface
                .notify(NotificationType::Follow, msg.origin(), follower, None)
                .await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    async fn undo_boost(&self, msg: &Message, boost: &Status) -> CourierResult<()> {
        let mut outcome = Outcome::default();
        outcome.record(
            "statuses_count",
            decrement_statuses_count(self.ctx(), msg.origin(), boost).await,
        );
        outcome.record(
            "timeline",
            self.surface.delete_status_from_timelines(boost).await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.finish()
    }

    /// The processor already removed the rows when the author deleted the
    /// status; the account cascade relies on the wipe here instead.
    async fn delete_status(&self, msg: &Message, status: &Status) -> CourierResult<()> {
        let mut outcome = Outcome::default();
        outcome.record(
            "timeline",
            self.surface.delete_status_from_timelines(status).await,
        );
        outcome.record(
            "statuses_count",
            decrement_statuses_count(self.ctx(), msg.origin(), status).await,
        );
        outcome.record("federate", self.federate.federate(msg).await);
        outcome.record("wipe", self.processor.status.wipe(status).await);
        outcome.finish()
    }

    async fn delete_account(&self, msg: &Message, account: &Account) -> CourierResult<()> {
        // Federate first; the actor is gone once the cascade finishes
        let mut outcome = Outcome::default();
        outcome.record("federate", self.federate.federate(msg).await);

        let report = self.processor.account.delete_cascade(account).await;
        if !report.is_complete() {
            outcome.record::<()>(
                "cascade",
                Err(CourierError::Internal(format!(
                    "account {} deletion incomplete, failed steps: {:?}",
                    account.id,
                    report.failed_steps()
                ))),
            );
        }
        outcome.finish()
    }

    async fn move_account(&self, msg: &Message, mv: &AccountMove) -> CourierResult<()> {
        let mut outcome = Outcome::default();
        outcome.record("federate", self.federate.federate(msg).await);

        let target = match msg.target() {
            Some(target) => Some(target.clone()),
            None => self.ctx().db.get_account_by_uri(&mv.target_uri).await?,
        };
        match target {
            Some(target) => outcome.record(
                "redirect_followers",
                self.processor
                    .account
                    .redirect_followers(msg.origin(), &target)
                    .await,
            ),
            None => warn!(target = %mv.target_uri, "Move target unknown, followers stay"),
        }
        outcome.finish()
    }
}

fn required_target(msg: &Message) -> CourierResult<&Account> {
    msg.target().ok_or_else(|| {
        CourierError::Internal(format!(
            "{} {} carries no target account",
            msg.activity_type(),
            msg.object_type()
        ))
    })
}
