/// Outbound federation
///
/// Side-effect handlers describe what should reach remote servers as an
/// [`OutboundActivity`]; the [`Federator`] turns it into signed deliveries.
/// Only local-origin messages are ever federated.

use crate::error::CourierResult;
use crate::messages::{ActivityType, ObjectType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

/// One activity to deliver to remote inboxes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundActivity {
    pub activity_type: ActivityType,
    pub object_type: ObjectType,
    /// URI of the local actor performing the activity
    pub actor_uri: String,
    /// URI of the object acted upon (status, follow, account...)
    pub object_uri: String,
    /// Actor the activity is addressed to, when there is a single one
    pub target_uri: Option<String>,
    pub published: DateTime<Utc>,
}

impl OutboundActivity {
    pub fn new(
        activity_type: ActivityType,
        object_type: ObjectType,
        actor_uri: &str,
        object_uri: &str,
    ) -> Self {
        Self {
            activity_type,
            object_type,
            actor_uri: actor_uri.to_string(),
            object_uri: object_uri.to_string(),
            target_uri: None,
            published: Utc::now(),
        }
    }

    pub fn to(mut self, target_uri: &str) -> Self {
        self.target_uri = Some(target_uri.to_string());
        self
    }
}

/// Delivery backend
#[async_trait]
pub trait Federator: Send + Sync {
    async fn deliver(&self, activity: OutboundActivity) -> CourierResult<()>;
}

/// Federator that only logs; used when delivery is handled elsewhere
#[derive(Debug, Default)]
pub struct LoggingFederator;

#[async_trait]
impl Federator for LoggingFederator {
    async fn deliver(&self, activity: OutboundActivity) -> CourierResult<()> {
        info!(
            activity = %activity.activity_type,
            object = %activity.object_type,
            actor = %activity.actor_uri,
            object_uri = %activity.object_uri,
            target = activity.target_uri.as_deref().unwrap_or(""),
            "Delivering activity"
        );
        Ok(())
    }
}

/// Federator that keeps every delivered activity in memory
#[derive(Debug, Default)]
pub struct RecordingFederator {
    delivered: Mutex<Vec<OutboundActivity>>,
}

impl RecordingFederator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<OutboundActivity> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Federator for RecordingFederator {
    async fn deliver(&self, activity: OutboundActivity) -> CourierResult<()> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(activity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_federator() {
        let federator = RecordingFederator::new();
        let activity = OutboundActivity::new(
            ActivityType::Create,
            ObjectType::Follow,
            "https://example.org/users/alice",
            "https://example.org/follows/1",
        )
        .to("https://remote.net/users/bob");

        tokio_test::block_on(federator.deliver(activity.clone())).unwrap();
        tokio_test::block_on(LoggingFederator.deliver(activity.clone())).unwrap();

        assert_eq!(federator.delivered(), vec![activity]);
    }
}
