/// Account mutes
///
/// Mutes stay local: nothing is federated and the target is never told.
use super::{AccountProcessor, Relationship};
use crate::error::{CourierError, CourierResult};
use crate::model::{new_id, Account, UserMute};
use chrono::{Duration, Utc};
use tracing::debug;

impl AccountProcessor {
    /// Mute `target_id`, replacing the settings of an existing mute
    ///
    /// A `duration` of zero seconds or less mutes indefinitely.
    pub async fn mute(
        &self,
        requester: &Account,
        target_id: &str,
        notifications: bool,
        duration: Option<Duration>,
    ) -> CourierResult<Relationship> {
        if requester.id == target_id {
            return Err(CourierError::Unprocessable(
                "account cannot mute itself".to_string(),
            ));
        }

        let target = self.get_account(target_id).await?;
        let now = Utc::now();

        let mute = UserMute {
            id: new_id(),
            account_id: requester.id.clone(),
            target_account_id: target.id.clone(),
            notifications,
            expires_at: duration.filter(|d| *d > Duration::zero()).map(|d| now + d),
            created_at: now,
        };
        self.ctx.db.put_user_mute(&mute).await?;

        debug!(account = %requester.id, target = %target.id, notifications, "Account muted");
        self.relationship(requester, target_id).await
    }

    /// Lift a mute; unmuting an account that is not muted is a no-op
    pub async fn unmute(&self, requester: &Account, target_id: &str) -> CourierResult<Relationship> {
        let target = self.get_account(target_id).await?;
        self.ctx.db.delete_user_mute(&requester.id, &target.id).await?;
        self.relationship(requester, target_id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CourierError;
    use crate::processing::testing::TestEnv;
    use chrono::Duration;

    #[tokio::test]
    async fn test_mute_and_unmute() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;

        let rel = env.processor.account.mute(&alice, &bob.id, true, None).await.unwrap();
        assert!(rel.muting);
        assert!(rel.muting_notifications);

        // Muting again only changes the settings
        let rel = env
            .processor
            .account
            .mute(&alice, &bob.id, false, Some(Duration::hours(1)))
            .await
            .unwrap();
        assert!(rel.muting);
        assert!(!rel.muting_notifications);
        let stored = env.ctx.db.get_user_mute(&alice.id, &bob.id).await.unwrap().unwrap();
        assert!(stored.expires_at.is_some());

        let rel = env.processor.account.unmute(&alice, &bob.id).await.unwrap();
        assert!(!rel.muting);
        assert!(env.processor.account.unmute(&alice, &bob.id).await.is_ok());

        // Nothing federates
        assert!(env.drain_client().is_empty());
    }

    #[tokio::test]
    async fn test_mute_self_is_rejected() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;

        let err = env
            .processor
            .account
            .mute(&alice, &alice.id, true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CourierError::Unprocessable(_)));
    }
}
