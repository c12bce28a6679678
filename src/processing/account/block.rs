/// Blocks
use super::{AccountProcessor, Relationship};
use crate::error::{CourierError, CourierResult};
use crate::messages::{ActivityType, Message, Payload};
use crate::model::{new_id, Account, Block};
use chrono::Utc;

impl AccountProcessor {
    /// Block `target_id`, severing follows in both directions
    ///
    /// The target's follows and requests towards the requester are removed
    /// silently; the requester's own are undone with a message each.
    pub async fn block(&self, requester: &Account, target_id: &str) -> CourierResult<Relationship> {
        if requester.id == target_id {
            return Err(CourierError::Unprocessable(
                "account cannot block itself".to_string(),
            ));
        }

        let target = self.get_account(target_id).await?;

        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let db = &self.ctx.db;
        if db.get_block(&requester.id, &target.id).await?.is_some() {
            return self.relationship(requester, target_id).await;
        }

        let id = new_id();
        let block = Block {
            uri: format!("{}/blocks/{}", requester.uri, id),
            id,
            account_id: requester.id.clone(),
            target_account_id: target.id.clone(),
            created_at: Utc::now(),
        };
        db.insert_block(&block).await?;

        db.delete_follow(&target.id, &requester.id).await?;
        db.delete_follow_request(&target.id, &requester.id).await?;

        let mut msgs = self.remove_outgoing_follows(requester, &target).await?;
        msgs.push(
            Message::new(ActivityType::Create, Payload::Block(block), requester.clone())
                .with_target(target),
        );
        for msg in msgs {
            self.ctx.workers.route(msg);
        }

        self.relationship(requester, target_id).await
    }

    /// Lift a block; unblocking an account that is not blocked is a no-op
    pub async fn unblock(&self, requester: &Account, target_id: &str) -> CourierResult<Relationship> {
        let target = self.get_account(target_id).await?;

        let _guard = self.ctx.locks.lock(&requester.uri).await;

        if let Some(block) = self.ctx.db.get_block(&requester.id, &target.id).await? {
            self.ctx.db.delete_block(&requester.id, &target.id).await?;
            self.ctx.workers.route(
                Message::new(ActivityType::Undo, Payload::Block(block), requester.clone())
                    .with_target(target),
            );
        }

        self.relationship(requester, target_id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::messages::{ActivityType, ObjectType};
    use crate::processing::testing::TestEnv;

    #[tokio::test]
    async fn test_block_removes_follows_both_ways() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.remote_account("bob", "remote.net").await;
        env.follow(&alice, &bob).await;
        env.follow(&bob, &alice).await;

        let rel = env.processor.account.block(&alice, &bob.id).await.unwrap();
        assert!(rel.blocking);
        assert!(!rel.following);
        assert!(!rel.followed_by);

        let msgs = env.drain_client();
        let kinds: Vec<_> = msgs
            .iter()
            .map(|m| (m.activity_type(), m.object_type()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ActivityType::Undo, ObjectType::Follow),
                (ActivityType::Create, ObjectType::Block),
            ]
        );

        // Blocking twice is a no-op
        env.processor.account.block(&alice, &bob.id).await.unwrap();
        assert!(env.drain_client().is_empty());
    }

    #[tokio::test]
    async fn test_unblock() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;

        env.processor.account.block(&alice, &bob.id).await.unwrap();
        env.drain_client();

        let rel = env.processor.account.unblock(&alice, &bob.id).await.unwrap();
        assert!(!rel.blocking);
        let msgs = env.drain_client();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].activity_type(), ActivityType::Undo);

        env.processor.account.unblock(&alice, &bob.id).await.unwrap();
        assert!(env.drain_client().is_empty());
    }
}
