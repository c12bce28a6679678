/// Status deletion
use super::StatusProcessor;
use crate::error::CourierResult;
use crate::messages::{ActivityType, Message, Payload};
use crate::model::{Account, Status};
use tracing::debug;

impl StatusProcessor {
    /// Delete one of `requester`'s statuses
    ///
    /// Local rows go right away; stats, streams and federation follow in
    /// the `Delete Note` handler.
    pub async fn delete(&self, requester: &Account, status_id: &str) -> CourierResult<Status> {
        let status = self.get_own_status(requester, status_id).await?;

        self.wipe(&status).await?;

        self.ctx.workers.route(Message::new(
            ActivityType::Delete,
            Payload::Status(Box::new(status.clone())),
            requester.clone(),
        ));

        Ok(status)
    }

    /// Remove a status and everything hanging off it
    ///
    /// Safe to run more than once; a second run finds nothing to remove.
    pub(crate) async fn wipe(&self, status: &Status) -> CourierResult<()> {
        if let Some(poll_id) = &status.poll_id {
            if let Some(poll) = self.ctx.db.get_poll(poll_id).await? {
                self.delete_poll(&poll).await?;
            }
        }

        let faves = self.ctx.db.delete_faves_of_status(&status.id).await?;
        let bookmarks = self.ctx.db.delete_bookmarks_of_status(&status.id).await?;
        let notifications = self.ctx.db.delete_notifications_of_status(&status.id).await?;
        self.ctx.db.detach_media_from_status(&status.id).await?;

        for boost in self.ctx.db.boosts_of(&status.id).await? {
            self.ctx.db.delete_notifications_of_status(&boost.id).await?;
            self.ctx.db.delete_status(&boost.id).await?;
        }

        if self.ctx.db.delete_status(&status.id).await? {
            debug!(
                status = %status.id,
                faves,
                bookmarks,
                notifications,
                "Status wiped"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CourierError;
    use crate::messages::ActivityType;
    use crate::model::{new_id, Bookmark, PollRequest, StatusCreateRequest};
    use crate::processing::testing::TestEnv;
    use chrono::Utc;

    #[tokio::test]
    async fn test_delete_removes_status_and_poll() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;

        let status = env
            .processor
            .status
            .create(
                &alice,
                StatusCreateRequest {
                    status: "poll".to_string(),
                    poll: Some(PollRequest {
                        options: vec!["a".into(), "b".into()],
                        expires_in: 600,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let poll_id = status.poll_id.clone().unwrap();
        env.ctx
            .db
            .insert_bookmark(&Bookmark {
                id: new_id(),
                account_id: bob.id.clone(),
                status_id: status.id.clone(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        env.drain_client();

        env.processor.status.delete(&alice, &status.id).await.unwrap();

        assert!(env.ctx.db.get_status(&status.id).await.unwrap().is_none());
        assert!(env.ctx.db.get_poll(&poll_id).await.unwrap().is_none());
        assert!(!env.ctx.workers.scheduler.is_pending(&poll_id));
        assert!(env.ctx.db.bookmarkers_of(&status.id).await.unwrap().is_empty());

        let msgs = env.drain_client();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].activity_type(), ActivityType::Delete);

        let err = env.processor.status.delete(&alice, &status.id).await.unwrap_err();
        assert!(matches!(err, CourierError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cannot_delete_someone_elses_status() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        let status = env.post(&alice, "mine").await;

        assert!(env.processor.status.delete(&bob, &status.id).await.is_err());
        assert!(env.ctx.db.get_status(&status.id).await.unwrap().is_some());
    }
}
