/// Streaming surface for per-account timeline events
///
/// Handlers publish here after persisting; whatever serves streaming
/// clients subscribes. Events published with no subscriber are dropped.

use crate::model::{Notification, Status};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum StreamEvent {
    /// New status on a home timeline
    Update(Box<Status>),
    /// Existing status was edited
    StatusUpdate(Box<Status>),
    /// Status was removed
    Delete(String),
    Notification(Box<Notification>),
}

/// Event addressed to one account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountEvent {
    pub account_id: String,
    pub event: StreamEvent,
}

pub struct Streams {
    sender: broadcast::Sender<AccountEvent>,
}

impl Streams {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AccountEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, account_id: &str, event: StreamEvent) {
        let delivered = self
            .sender
            .send(AccountEvent {
                account_id: account_id.to_string(),
                event,
            })
            .unwrap_or(0);
        trace!(account = account_id, delivered, "Stream event published");
    }

    pub fn update(&self, account_id: &str, status: &Status) {
        self.publish(account_id, StreamEvent::Update(Box::new(status.clone())));
    }

    pub fn status_update(&self, account_id: &str, status: &Status) {
        self.publish(account_id, StreamEvent::StatusUpdate(Box::new(status.clone())));
    }

    pub fn delete(&self, account_id: &str, status_id: &str) {
        self.publish(account_id, StreamEvent::Delete(status_id.to_string()));
    }

    pub fn notify(&self, notification: &Notification) {
        self.publish(
            &notification.target_account_id,
            StreamEvent::Notification(Box::new(notification.clone())),
        );
    }
}

impl Default for Streams {
    fn default() -> Self {
        Self::new()
    }
}
