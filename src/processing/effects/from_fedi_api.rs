/// Side effects of activities received from remote instances
///
/// The rows behind a message are stored by inbound federation before it is
/// routed here. Nothing in this handler federates on behalf of the remote
/// origin; the only outbound traffic is a local account answering it.
use super::{
    decrement_statuses_count, increment_statuses_count, unhandled, Federate, Outcome, Surface,
};
use crate::error::{CourierError, CourierResult};
use crate::messages::{AccountMove, ActivityType, Message, Payload};
use crate::model::{Account, Block, Fave, Follow, FollowRequest, NotificationType, Poll, PollVote, Status};
use crate::processing::account::moved::check_move;
use crate::processing::Processor;
use crate::workers::MessageHandler;
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub struct FediApiHandler {
    processor: Processor,
    surface: Surface,
    federate: Federate,
}

impl FediApiHandler {
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
impl MessageHandler for FediApiHandler {
    async fn handle(&self, msg: &Message) -> CourierResult<()> {
        debug!(message = %msg, "Processing federated message");

        match (msg.activity_type(), msg.payload()) {
            (ActivityType::Create, Payload::Status(status)) => self.create_status(msg, status).await,
            (ActivityType::Create, Payload::Boost(boost)) => self.create_status(msg, boost).await,
            (ActivityType::Create, Payload::FollowRequest(request)) => {
                self.create_follow_request(msg, request.clone()).await
            }
            (ActivityType::Create, Payload::Follow(follow)) => {
                self.create_follow_request(msg, as_request(follow)).await
            }
            (ActivityType::Create, Payload::Fave(fave)) => self.create_fave(msg, fave).await,
            (ActivityType::Create, Payload::Block(block)) => self.create_block(block).await,
            (ActivityType::Create, Payload::PollVote(vote)) => self.create_poll_vote(vote).await,

            (ActivityType::Update, Payload::Status(status)) => {
                self.surface
                    .timeline_and_notify_status_update(status, msg.origin())
                    .await
            }
            (ActivityType::Update, Payload::Account(account)) => {
                self.update_profile(account).await
            }
            (ActivityType::Update, Payload::PollClosed { poll, status }) => {
                self.close_poll(msg, poll, status).await
            }

            (ActivityType::Accept, Payload::Follow(_) | Payload::FollowRequest(_)) => {
                self.accept_follow(msg).await
            }
            (ActivityType::Reject, Payload::Follow(_) | Payload::FollowRequest(_)) => {
                self.reject_follow(msg).await
            }

            (ActivityType::Undo, Payload::Follow(f)) => {
                self.undo_follow(&f.account_id, &f.target_account_id).await
            }
            (ActivityType::Undo, Payload::FollowRequest(f)) => {
                self.undo_follow(&f.account_id, &f.target_account_id).await
            }
            (ActivityType::Undo, Payload::Block(block)) => {
                self.processor
                    .ctx
                    .db
                    .delete_block(&block.account_id, &block.target_account_id)
                    .await
                    .map(drop)
            }
            (ActivityType::Undo, Payload::Fave(fave)) => {
                self.processor
                    .ctx
                    .db
                    .delete_fave(&fave.account_id, &fave.status_id)
                    .await
                    .map(drop)
            }
            (ActivityType::Undo, Payload::Boost(boost)) => self.delete_status(msg, boost).await,

            (ActivityType::Delete, Payload::Status(status)) => self.delete_status(msg, status).await,
            (ActivityType::Delete, Payload::Account(account)) => self.delete_account(account).await,

            (ActivityType::Move, Payload::Move(mv)) => self.move_account(msg, mv).await,

            _ => Err(unhandled(msg)),
        }
    }
}

/// Inbound `Follow` activities are requests until a local account accepts
fn as_request(follow: &Follow) -> FollowRequest {
    FollowRequest {
        id: follow.id.clone(),
        uri: follow.uri.clone(),
        account_id: follow.account_id.clone(),
        target_account_id: follow.target_account_id.clone(),
        created_at: follow.created_at,
    }
}

impl FediApiHandler {
    fn ctx(&self) -> &crate::context::AppContext {
        &self.processor.ctx
    }

    async fn target_of(&self, msg: &Message, account_id: &str) -> CourierResult<Option<Account>> {
        match msg.target() {
            Some(target) if target.id == account_id => Ok(Some(target.clone())),
            _ => self.ctx().db.get_account(account_id).await,
        }
    }

    /// Remote statuses and boosts land on local timelines
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
        outcome.finish()
    }

    /// Locked accounts are told about the request; unlocked ones accept it
    async fn create_follow_request(&self, msg: &Message, request: FollowRequest) -> CourierResult<()> {
        let follower = msg.origin();
        let Some(followee) = self.target_of(msg, &request.target_account_id).await? else {
            warn!(target = %request.target_account_id, "Follow target vanished");
            return Ok(());
        };

        if followee.locked {
            self.surface
                .notify(NotificationType::FollowRequest, &followee, follower, None)
                .await?;
            return Ok(());
        }

        let _guard = self.ctx().locks.lock(&follower.uri).await;

        self.ctx()
            .db
            .delete_follow_request(&request.account_id, &request.target_account_id)
            .await?;
        let follow = request.into_follow();
        match self.ctx().db.insert_follow(&follow).await {
            Ok(()) | Err(CourierError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }

        info!(follower = %follower.uri, followee = %followee.id, "Follow auto-accepted");

        self.ctx().workers.route(
            Message::new(ActivityType::Accept, Payload::Follow(follow), followee)
                .with_target(follower.clone()),
        );
        Ok(())
    }

    async fn create_fave(&self, msg: &Message, fave: &Fave) -> CourierResult<()> {
        let Some(author) = self.target_of(msg, &fave.target_account_id).await? else {
            return Ok(());
        };
        self.surface
            .notify(NotificationType::Favourite, &author, msg.origin(), Some(&fave.status_id))
            .await
            .map(drop)
    }

    /// A block severs follows and pending requests in both directions
    async fn create_block(&self, block: &Block) -> CourierResult<()> {
        let db = &self.ctx().db;
        let (a, b) = (&block.account_id, &block.target_account_id);
        db.delete_follow(a, b).await?;
        db.delete_follow(b, a).await?;
        db.delete_follow_request(a, b).await?;
        db.delete_follow_request(b, a).await?;
        Ok(())
    }

    /// Votes on local polls go back out as an update of the poll's status
    async fn create_poll_vote(&self, vote: &PollVote) -> CourierResult<()> {
        let db = &self.ctx().db;
        let Some(poll) = db.get_poll(&vote.poll_id).await? else {
            return Ok(());
        };
        let Some(mut status) = db.get_status(&poll.status_id).await? else {
            return Ok(());
        };
        if !status.local {
            return Ok(());
        }
        db.populate_status(&mut status).await?;
        let Some(author) = db.get_account(&status.account_id).await? else {
            return Ok(());
        };

        self.ctx().streams.status_update(&author.id, &status);
        let update = Message::new(ActivityType::Update, Payload::Status(Box::new(status)), author);
        self.federate.federate(&update).await
    }

    async fn close_poll(&self, msg: &Message, poll: &Poll, status: &Status) -> CourierResult<()> {
        self.surface.notify_poll_close(poll, status, msg.origin()).await
    }

    /// `origin` (remote) accepted a follow from `target` (local)
    async fn accept_follow(&self, msg: &Message) -> CourierResult<()> {
        let Some(follower) = msg.target() else {
            return Ok(());
        };
        let followee = msg.origin();
        let _guard = self.ctx().locks.lock(&follower.uri).await;

        let Some(request) = self.ctx().db.get_follow_request(&follower.id, &followee.id).await? else {
            debug!(follower = %follower.id, followee = %followee.uri, "Accept for unknown request");
            return Ok(());
        };
        self.ctx()
            .db
            .delete_follow_request(&follower.id, &followee.id)
            .await?;
        match self.ctx().db.insert_follow(&request.into_follow()).await {
            Ok(()) | Err(CourierError::Conflict(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn reject_follow(&self, msg: &Message) -> CourierResult<()> {
        let Some(follower) = msg.target() else {
            return Ok(());
        };
        self.undo_follow(&follower.id, &msg.origin().id).await
    }

    async fn undo_follow(&self, account_id: &str, target_account_id: &str) -> CourierResult<()> {
        let db = &self.ctx().db;
        db.delete_follow(account_id, target_account_id).await?;
        db.delete_follow_request(account_id, target_account_id).await?;
        Ok(())
    }

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
        outcome.record("wipe", self.processor.status.wipe(status).await);
        outcome.finish()
    }

    async fn delete_account(&self, account: &Account) -> CourierResult<()> {
        let report = self.processor.account.delete_cascade(account).await;
        if report.is_complete() {
            return Ok(());
        }
        Err(CourierError::Internal(format!(
            "account {} deletion incomplete, failed steps: {:?}",
            account.id,
            report.failed_steps()
        )))
    }

    /// Take the profile fields of a remote account's new snapshot
    ///
    /// Counters, move and suspension state are owned locally and kept from
    /// the stored row.
    async fn update_profile(&self, snapshot: &Account) -> CourierResult<()> {
        let db = &self.ctx().db;
        let _guard = self.ctx().locks.lock(&snapshot.uri).await;
        let Some(mut account) = db.get_account(&snapshot.id).await? else {
            debug!(account = %snapshot.uri, "Update for unknown account");
            return Ok(());
        };

        account.display_name = snapshot.display_name.clone();
        account.language = snapshot.language.clone();
        account.locked = snapshot.locked;
        account.interaction_policies = snapshot.interaction_policies.clone();
        account.also_known_as = snapshot.also_known_as.clone();
        db.update_account(&account).await
    }

    /// Record the move and follow the account to its new home
    async fn move_account(&self, msg: &Message, mv: &AccountMove) -> CourierResult<()> {
        let db = &self.ctx().db;
        let target = match msg.target() {
            Some(target) => target.clone(),
            None => db.get_account_by_uri(&mv.target_uri).await?.ok_or_else(|| {
                CourierError::Unprocessable(format!("move target {} is not known", mv.target_uri))
            })?,
        };

        let origin = {
            let _guard = self.ctx().locks.lock(&msg.origin().uri).await;
            let Some(mut origin) = db.get_account(&msg.origin().id).await? else {
                return Ok(());
            };
            check_move(&origin, &target)?;
            if origin.moved_to_uri.as_deref() != Some(target.uri.as_str()) {
                origin.moved_to_uri = Some(target.uri.clone());
                db.update_account(&origin).await?;
            }
            origin
        };

        self.processor
            .account
            .redirect_followers(&origin, &target)
            .await
            .map(drop)
    }
}
