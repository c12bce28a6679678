/// Faves and boosts
use super::{status_uri, StatusProcessor};
use crate::error::{CourierError, CourierResult};
use crate::messages::{ActivityType, Message, Payload};
use crate::model::{new_id, Account, Fave, Status, StatusObjectType, Visibility};
use chrono::Utc;

impl StatusProcessor {
    /// Boosts resolve to the status they wrap
    async fn get_interaction_target(&self, requester: &Account, status_id: &str) -> CourierResult<Status> {
        let status = self.get_visible_status(Some(requester), status_id).await?;
        match &status.boost_of_id {
            Some(original) => self.get_visible_status(Some(requester), original).await,
            None => Ok(status),
        }
    }

    /// Fave a status; faving twice returns the existing fave
    pub async fn fave(&self, requester: &Account, status_id: &str) -> CourierResult<Fave> {
        let target = self.get_interaction_target(requester, status_id).await?;

        let existing = self
            .ctx
            .db
            .faves_of_status(&target.id)
            .await?
            .into_iter()
            .find(|f| f.account_id == requester.id);
        if let Some(fave) = existing {
            return Ok(fave);
        }

        let id = new_id();
        let fave = Fave {
            uri: format!("{}/liked/{}", requester.uri, id),
            id,
            account_id: requester.id.clone(),
            target_account_id: target.account_id.clone(),
            status_id: target.id.clone(),
            created_at: Utc::now(),
        };
        self.ctx.db.insert_fave(&fave).await?;

        let author = self.get_author(&target).await?;
        self.ctx.workers.route(
            Message::new(ActivityType::Create, Payload::Fave(fave.clone()), requester.clone())
                .with_target(author),
        );

        Ok(fave)
    }

    /// Remove `requester`'s fave, if there is one
    pub async fn unfave(&self, requester: &Account, status_id: &str) -> CourierResult<Option<Fave>> {
        let target = self.get_interaction_target(requester, status_id).await?;

        let existing = self
            .ctx
            .db
            .faves_of_status(&target.id)
            .await?
            .into_iter()
            .find(|f| f.account_id == requester.id);
        let Some(fave) = existing else {
            return Ok(None);
        };

        self.ctx.db.delete_fave(&requester.id, &target.id).await?;

        let author = self.get_author(&target).await?;
        self.ctx.workers.route(
            Message::new(ActivityType::Undo, Payload::Fave(fave.clone()), requester.clone())
                .with_target(author),
        );

        Ok(Some(fave))
    }

    /// Boost a status, returning the wrapper status
    pub async fn boost(&self, requester: &Account, status_id: &str) -> CourierResult<Status> {
        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let target = self.get_interaction_target(requester, status_id).await?;

        let restricted = matches!(target.visibility, Visibility::FollowersOnly | Visibility::Direct);
        if restricted && target.account_id != requester.id {
            return Err(CourierError::Forbidden("status is not boostable".to_string()));
        }
        if target.visibility == Visibility::Direct {
            return Err(CourierError::Forbidden("direct statuses cannot be boosted".to_string()));
        }

        let existing = self
            .ctx
            .db
            .boosts_of(&target.id)
            .await?
            .into_iter()
            .find(|b| b.account_id == requester.id);
        if let Some(boost) = existing {
            return Ok(boost);
        }

        let id = new_id();
        let boost = Status {
            uri: status_uri(requester, &id),
            id,
            account_id: requester.id.clone(),
            in_reply_to_id: None,
            in_reply_to_account_id: None,
            boost_of_id: Some(target.id.clone()),
            content: String::new(),
            content_warning: String::new(),
            text: String::new(),
            language: String::new(),
            sensitive: target.sensitive,
            visibility: target.visibility,
            attachment_ids: Vec::new(),
            mention_ids: Vec::new(),
            tags: Vec::new(),
            emojis: Vec::new(),
            poll_id: None,
            object_type: StatusObjectType::Note,
            local: requester.is_local(),
            pinned_at: None,
            created_at: Utc::now(),
            edited_at: None,
            poll: None,
            attachments: Vec::new(),
        };
        self.ctx.db.insert_status(&boost).await?;

        let author = self.get_author(&target).await?;
        self.ctx.workers.route(
            Message::new(ActivityType::Create, Payload::Boost(Box::new(boost.clone())), requester.clone())
                .with_target(author),
        );

        Ok(boost)
    }

    /// Undo `requester`'s boost of a status, if there is one
    pub async fn unboost(&self, requester: &Account, status_id: &str) -> CourierResult<Option<Status>> {
        let _guard = self.ctx.locks.lock(&requester.uri).await;

        let target = self.get_interaction_target(requester, status_id).await?;

        let existing = self
            .ctx
            .db
            .boosts_of(&target.id)
            .await?
            .into_iter()
            .find(|b| b.account_id == requester.id);
        let Some(boost) = existing else {
            return Ok(None);
        };

        self.ctx.db.delete_notifications_of_status(&boost.id).await?;
        self.ctx.db.delete_status(&boost.id).await?;

        let author = self.get_author(&target).await?;
        self.ctx.workers.route(
            Message::new(ActivityType::Undo, Payload::Boost(Box::new(boost.clone())), requester.clone())
                .with_target(author),
        );

        Ok(Some(boost))
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CourierError;
    use crate::messages::{ActivityType, Payload};
    use crate::model::Visibility;
    use crate::processing::testing::TestEnv;

    #[tokio::test]
    async fn test_fave_is_idempotent() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        let status = env.post(&alice, "like me").await;
        env.drain_client();

        let first = env.processor.status.fave(&bob, &status.id).await.unwrap();
        let second = env.processor.status.fave(&bob, &status.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(env.drain_client().len(), 1);

        let removed = env.processor.status.unfave(&bob, &status.id).await.unwrap();
        assert_eq!(removed.map(|f| f.id), Some(first.id));
        assert!(env.processor.status.unfave(&bob, &status.id).await.unwrap().is_none());

        let msgs = env.drain_client();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].activity_type(), ActivityType::Undo);
    }

    #[tokio::test]
    async fn test_boost_and_unboost() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let bob = env.local_account("bob").await;
        let status = env.post(&alice, "boost me").await;
        env.drain_client();

        let boost = env.processor.status.boost(&bob, &status.id).await.unwrap();
        assert_eq!(boost.boost_of_id.as_deref(), Some(status.id.as_str()));

        // Boosting the boost targets the original
        let again = env.processor.status.boost(&bob, &boost.id).await.unwrap();
        assert_eq!(again.id, boost.id);

        let msgs = env.drain_client();
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0].payload(), Payload::Boost(_)));
        assert_eq!(msgs[0].target().map(|a| a.id.as_str()), Some(alice.id.as_str()));

        env.processor.status.unboost(&bob, &status.id).await.unwrap();
        assert!(env.ctx.db.boosts_of(&status.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_followers_only_status_is_not_boostable() {
        let env = TestEnv::new().await;
        let alice = env.local_account("alice").await;
        let status = env.post_with_visibility(&alice, "inner circle", Visibility::FollowersOnly).await;

        // The author may still boost their own
        assert!(env.processor.status.boost(&alice, &status.id).await.is_ok());

        let bob = env.local_account("bob").await;
        env.follow(&bob, &alice).await;
        let err = env.processor.status.boost(&bob, &status.id).await.unwrap_err();
        assert!(matches!(err, CourierError::Forbidden(_)));
    }
}
