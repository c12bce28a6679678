/// Messages - records of completed mutations awaiting side effects
///
/// A message is built by a synchronous processor after its own write has
/// committed, then pushed to the worker matching the origin's locality.
/// Messages are immutable and carry no identity; handlers must tolerate
/// seeing the same effect twice.

use crate::model::{
    Account, Block, Fave, Follow, FollowRequest, Poll, PollVote, Status,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    Create,
    Update,
    Delete,
    Undo,
    Accept,
    Reject,
    Move,
    Announce,
    Flag,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Create => "Create",
            ActivityType::Update => "Update",
            ActivityType::Delete => "Delete",
            ActivityType::Undo => "Undo",
            ActivityType::Accept => "Accept",
            ActivityType::Reject => "Reject",
            ActivityType::Move => "Move",
            ActivityType::Announce => "Announce",
            ActivityType::Flag => "Flag",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What it happened to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    Note,
    Question,
    Person,
    Follow,
    Block,
    Like,
    Announce,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Note => "Note",
            ObjectType::Question => "Question",
            ObjectType::Person => "Person",
            ObjectType::Follow => "Follow",
            ObjectType::Block => "Block",
            ObjectType::Like => "Like",
            ObjectType::Announce => "Announce",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account move record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountMove {
    pub origin_uri: String,
    pub target_uri: String,
}

/// The mutated entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "model")]
pub enum Payload {
    Status(Box<Status>),
    /// Boost wrapper status
    Boost(Box<Status>),
    Follow(Follow),
    FollowRequest(FollowRequest),
    Block(Block),
    Fave(Fave),
    PollVote(PollVote),
    /// A poll reached its end; carries the closed poll and its status
    PollClosed { poll: Box<Poll>, status: Box<Status> },
    Account(Box<Account>),
    Move(AccountMove),
}

impl Payload {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Payload::Status(_) => ObjectType::Note,
            Payload::Boost(_) => ObjectType::Announce,
            Payload::Follow(_) | Payload::FollowRequest(_) => ObjectType::Follow,
            Payload::Block(_) => ObjectType::Block,
            Payload::Fave(_) => ObjectType::Like,
            Payload::PollVote(_) | Payload::PollClosed { .. } => ObjectType::Question,
            Payload::Account(_) | Payload::Move(_) => ObjectType::Person,
        }
    }
}

/// One completed mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    activity_type: ActivityType,
    payload: Payload,
    origin: Account,
    target: Option<Account>,
}

impl Message {
    pub fn new(activity_type: ActivityType, payload: Payload, origin: Account) -> Self {
        Self {
            activity_type,
            payload,
            origin,
            target: None,
        }
    }

    pub fn with_target(mut self, target: Account) -> Self {
        self.target = Some(target);
        self
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    pub fn object_type(&self) -> ObjectType {
        self.payload.object_type()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn origin(&self) -> &Account {
        &self.origin
    }

    pub fn target(&self) -> Option<&Account> {
        self.target.as_ref()
    }

    /// Local origin goes to the client worker, anything else to the federator
    pub fn is_local_origin(&self) -> bool {
        self.origin.is_local()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} from {}",
            self.activity_type,
            self.object_type(),
            self.origin.acct()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn follow() -> Follow {
        Follow {
            id: "f1".to_string(),
            uri: "https://example.org/follows/f1".to_string(),
            account_id: "a".to_string(),
            target_account_id: "b".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_object_type_follows_payload() {
        let origin = Account::new_local("https://example.org", "alice");
        let msg = Message::new(ActivityType::Undo, Payload::Follow(follow()), origin);
        assert_eq!(msg.object_type(), ObjectType::Follow);
        assert_eq!(msg.to_string(), "Undo Follow from alice");
        assert!(msg.target().is_none());
    }

    #[test]
    fn test_routing_by_origin_locality() {
        let local = Account::new_local("https://example.org", "alice");
        let remote = Account::new_remote("https://remote.net/users/bob", "bob", "remote.net");

        let from_local = Message::new(ActivityType::Create, Payload::Follow(follow()), local.clone())
            .with_target(remote.clone());
        let from_remote = Message::new(ActivityType::Create, Payload::Follow(follow()), remote)
            .with_target(local);

        assert!(from_local.is_local_origin());
        assert!(!from_remote.is_local_origin());
        assert_eq!(from_remote.target().map(|a| a.username.as_str()), Some("alice"));
    }
}
