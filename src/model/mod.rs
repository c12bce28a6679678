/// Domain models shared by the store, the processors and the workers
///
/// These mirror the rows kept in the database. Fields prefixed with a
/// populated relation (e.g. `Status::poll`) are filled by the store on
/// request and are never written back directly.

pub mod account;
pub mod notification;
pub mod policy;
pub mod poll;
pub mod relationship;
pub mod request;
pub mod scheduled;
pub mod status;

pub use account::Account;
pub use notification::{Notification, NotificationType};
pub use policy::{DefaultInteractionPolicies, InteractionPolicy, PolicyRules, PolicyValue};
pub use poll::{Poll, PollVote};
pub use relationship::{Block, Bookmark, Fave, Follow, FollowRequest, ThreadMute, UserMute};
pub use request::{AttachmentAttributes, PollRequest, StatusCreateRequest, StatusEditRequest};
pub use scheduled::ScheduledStatus;
pub use status::{Focus, MediaAttachment, Status, StatusEdit, StatusObjectType, Visibility};

/// Generate a new time-ordered identifier
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
