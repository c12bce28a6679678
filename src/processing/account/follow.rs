/// Follows and follow requests
use super::{AccountProcessor, Relationship};
use crate::error::{CourierError, CourierResult};
use crate::messages::{ActivityType, Message, Payload};
use crate::model::{new_id, Account, FollowRequest};
use chrono::Utc;
use tracing::debug;

impl AccountProcessor {
    /// Follow `target_id`, or ask to when the target must approve
    ///
    /// Following an account that is already followed or requested returns
    /// the current relationship unchanged.
    pub async fn follow(&self, requester: &Account, target_id: &str) -> CourierResult<Relationship> {
        let target = self.get_follow_target(requester, target_id).await?;

        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let db = &self.ctx.db;
        if db.get_follow(&requester.id, &target.id).await?.is_some()
            || db.get_follow_request(&requester.id, &target.id).await?.is_some()
        {
            return self.relationship(requester, target_id).await;
        }

        let id = new_id();
        let request = FollowRequest {
            uri: format!("{}/follow/{}", requester.uri, id),
            id,
            account_id: requester.id.clone(),
            target_account_id: target.id.clone(),
            created_at: Utc::now(),
        };

        if target.is_local() && !target.locked {
            let follow = request.into_follow();
            db.insert_follow(&follow).await?;
            debug!(follower = %requester.id, target = %target.id, "Follow accepted outright");
            self.ctx.workers.route(
                Message::new(ActivityType::Create, Payload::Follow(follow), requester.clone())
                    .with_target(target),
            );
        } else {
            db.insert_follow_request(&request).await?;
            self.ctx.workers.route(
                Message::new(
                    ActivityType::Create,
                    Payload::FollowRequest(request),
                    requester.clone(),
                )
                .with_target(target),
            );
        }

        self.relationship(requester, target_id).await
    }

    /// Drop a follow or a pending follow request, whichever exists
    pub async fn unfollow(&self, requester: &Account, target_id: &str) -> CourierResult<Relationship> {
        let target = self.get_follow_target(requester, target_id).await?;

        let _guard = self.ctx.locks.lock(&requester.uri).await;

        for msg in self.remove_outgoing_follows(requester, &target).await? {
            self.ctx.workers.route(msg);
        }

        self.relationship(requester, target_id).await
    }

    /// Approve a pending request made to `requester` by `origin_id`
    pub async fn accept_follow_request(
        &self,
        requester: &Account,
        origin_id: &str,
    ) -> CourierResult<Relationship> {
        let origin = self.get_account(origin_id).await?;

        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let request = self
            .ctx
            .db
            .get_follow_request(&origin.id, &requester.id)
            .await?
            .ok_or_else(|| CourierError::NotFound("follow request not found".to_string()))?;

        self.ctx.db.delete_follow_request(&origin.id, &requester.id).await?;
        let follow = request.into_follow();
        self.ctx.db.insert_follow(&follow).await?;

        self.ctx.workers.route(
            Message::new(ActivityType::Accept, Payload::Follow(follow), requester.clone())
                .with_target(origin),
        );

        self.relationship(requester, origin_id).await
    }

    /// Turn down a pending request made to `requester` by `origin_id`
    pub async fn reject_follow_request(
        &self,
        requester: &Account,
        origin_id: &str,
    ) -> CourierResult<Relationship> {
        let origin = self.get_account(origin_id).await?;

        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let request = self
            .ctx
            .db
            .get_follow_request(&origin.id, &requester.id)
            .await?
            .ok_or_else(|| CourierError::NotFound("follow request not found".to_string()))?;

        self.ctx.db.delete_follow_request(&origin.id, &requester.id).await?;

        self.ctx.workers.route(
            Message::new(ActivityType::Reject, Payload::FollowRequest(request), requester.clone())
                .with_target(origin),
        );

        self.relationship(requester, origin_id).await
    }

    async fn get_follow_target(&self, requester: &Account, target_id: &str) -> CourierResult<Account> {
        if requester.id == target_id {
            return Err(CourierError::Unprocessable(
                "account can't follow or unfollow itself".to_string(),
            ));
        }

        if self.ctx.db.is_either_blocked(&requester.id, target_id).await? {
            return Err(CourierError::NotFound("block exists between accounts".to_string()));
        }

        self.get_account(target_id).await
    }

    /// Delete `requester`'s follow and follow request targeting `target`
    ///
    /// Returns an `Undo` message for each edge that existed. Callers must
    /// hold the requester's lock.
    pub(crate) async fn remove_outgoing_follows(
        &self,
        requester: &Account,
        target: &Account,
    ) -> CourierResult<Vec<Message>> {
        let db = &self.ctx.db;
        let mut msgs = Vec::new();

        if let Some(follow) = db.get_follow(&requester.id, &target.id).await? {
            db.delete_follow(&requester.id, &target.id).await?;
            msgs.push(
                Message::new(ActivityType::Undo, Payload::Follow(follow), requester.clone())
                    .with_target(target.clone()),
            );
        }

        if let Some(request) = db.get_follow_request(&requester.id, &target.id).await? {
            db.delete_follow_request(&requester.id, &target.id).await?;
            msgs.push(
                Message::new(ActivityType::Undo, Payload::FollowRequest(request), requester.clone())
                    .with_target(target.clone()),
            );
        }

        Ok(msgs)
    }
}
