/// Outbound federation of local-origin messages
use crate::context::AppContext;
use crate::error::CourierResult;
use crate::federation::OutboundActivity;
use crate::messages::{Message, ObjectType, Payload};
use tracing::trace;

#[derive(Clone)]
pub struct Federate {
    ctx: AppContext,
}

impl Federate {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Hand `msg` to the federator if it concerns anyone remote
    ///
    /// Messages from remote origins are never federated back out.
    /// Activities aimed at one account are only sent when that account is
    /// remote; statuses, profiles and moves go to followers regardless.
    pub async fn federate(&self, msg: &Message) -> CourierResult<()> {
        if !msg.is_local_origin() {
            return Ok(());
        }

        let Some(activity) = outbound(msg) else {
            trace!(message = %msg, "Nothing to federate");
            return Ok(());
        };

        self.ctx.federator.deliver(activity).await
    }
}

/// Build the outbound activity for a message, if it leaves this instance
fn outbound(msg: &Message) -> Option<OutboundActivity> {
    let addressed = msg.target().filter(|t| t.is_remote());

    let (object_type, object_uri, needs_remote_target) = match msg.payload() {
        Payload::Status(status) => (ObjectType::Note, status.uri.clone(), false),
        Payload::Boost(boost) => (ObjectType::Announce, boost.uri.clone(), false),
        Payload::Follow(follow) => (ObjectType::Follow, follow.uri.clone(), true),
        Payload::FollowRequest(request) => (ObjectType::Follow, request.uri.clone(), true),
        Payload::Block(block) => (ObjectType::Block, block.uri.clone(), true),
        Payload::Fave(fave) => (ObjectType::Like, fave.uri.clone(), true),
        Payload::PollVote(vote) => (
            ObjectType::Question,
            format!("{}#votes/{}", msg.origin().uri, vote.id),
            true,
        ),
        Payload::PollClosed { status, .. } => (ObjectType::Question, status.uri.clone(), false),
        Payload::Account(account) => (ObjectType::Person, account.uri.clone(), false),
        Payload::Move(mv) => (ObjectType::Person, mv.origin_uri.clone(), false),
    };

    if needs_remote_target && addressed.is_none() {
        return None;
    }

    let mut activity = OutboundActivity::new(
        msg.activity_type(),
        object_type,
        &msg.origin().uri,
        &object_uri,
    );
    if let Some(target) = addressed {
        activity = activity.to(&target.uri);
    } else if let Payload::Move(mv) = msg.payload() {
        activity = activity.to(&mv.target_uri);
    }
    Some(activity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ActivityType;
    use crate::model::{Account, Block};
    use chrono::Utc;

    fn block(from: &Account, to: &Account) -> Block {
        Block {
            id: "b1".to_string(),
            uri: format!("{}/blocks/b1", from.uri),
            account_id: from.id.clone(),
            target_account_id: to.id.clone(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_single_target_activities_need_remote_target() {
        let alice = Account::new_local("https://example.org", "alice");
        let bob = Account::new_local("https://example.org", "bob");
        let carol = Account::new_remote("https://remote.net/users/carol", "carol", "remote.net");

        let local = Message::new(ActivityType::Create, Payload::Block(block(&alice, &bob)), alice.clone())
            .with_target(bob);
        assert!(outbound(&local).is_none());

        let remote = Message::new(ActivityType::Create, Payload::Block(block(&alice, &carol)), alice.clone())
            .with_target(carol.clone());
        let activity = outbound(&remote).unwrap();
        assert_eq!(activity.object_type, ObjectType::Block);
        assert_eq!(activity.actor_uri, alice.uri);
        assert_eq!(activity.target_uri.as_deref(), Some(carol.uri.as_str()));
    }

    #[test]
    fn test_profile_updates_always_leave() {
        let alice = Account::new_local("https://example.org", "alice");
        let msg = Message::new(
            ActivityType::Update,
            Payload::Account(Box::new(alice.clone())),
            alice.clone(),
        );
        let activity = outbound(&msg).unwrap();
        assert_eq!(activity.object_uri, alice.uri);
        assert!(activity.target_uri.is_none());
    }
}
