/// Status visibility checks
use crate::db::Db;
use crate::error::CourierResult;
use crate::model::{Account, Status, Visibility};
use async_trait::async_trait;

/// Decides whether `viewer` (None for anonymous) may see `status`
#[async_trait]
pub trait VisibilityFilter: Send + Sync {
    async fn is_visible(&self, viewer: Option<&Account>, status: &Status) -> CourierResult<bool>;
}

/// Visibility from the status audience, follows and blocks
pub struct DefaultVisibility {
    db: Db,
}

impl DefaultVisibility {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl VisibilityFilter for DefaultVisibility {
    async fn is_visible(&self, viewer: Option<&Account>, status: &Status) -> CourierResult<bool> {
        let viewer = match viewer {
            Some(viewer) => viewer,
            None => {
                return Ok(matches!(
                    status.visibility,
                    Visibility::Public | Visibility::Unlisted
                ))
            }
        };

        if viewer.id == status.account_id {
            return Ok(true);
        }

        if self.db.is_either_blocked(&viewer.id, &status.account_id).await? {
            return Ok(false);
        }

        Ok(match status.visibility {
            Visibility::Public | Visibility::Unlisted => true,
            Visibility::FollowersOnly => {
                self.db.get_follow(&viewer.id, &status.account_id).await?.is_some()
                    || status.mention_ids.contains(&viewer.id)
            }
            Visibility::Direct => status.mention_ids.contains(&viewer.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::status::tests::note;
    use crate::model::{new_id, Block, Follow};
    use chrono::Utc;

    #[tokio::test]
    async fn test_audiences() {
        let db = Db::in_memory().await.unwrap();
        let filter = DefaultVisibility::new(db.clone());
        let alice = Account::new_local("https://example.org", "alice");
        let bob = Account::new_local("https://example.org", "bob");
        let carol = Account::new_local("https://example.org", "carol");

        let mut status = note(&alice, "hi");
        assert!(filter.is_visible(None, &status).await.unwrap());

        status.visibility = Visibility::FollowersOnly;
        assert!(!filter.is_visible(None, &status).await.unwrap());
        assert!(filter.is_visible(Some(&alice), &status).await.unwrap());
        assert!(!filter.is_visible(Some(&bob), &status).await.unwrap());

        db.insert_follow(&Follow {
            id: new_id(),
            uri: "https://example.org/follows/1".to_string(),
            account_id: bob.id.clone(),
            target_account_id: alice.id.clone(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        assert!(filter.is_visible(Some(&bob), &status).await.unwrap());

        status.visibility = Visibility::Direct;
        status.mention_ids = vec![carol.id.clone()];
        assert!(!filter.is_visible(Some(&bob), &status).await.unwrap());
        assert!(filter.is_visible(Some(&carol), &status).await.unwrap());
    }

    #[tokio::test]
    async fn test_blocks_hide_public_statuses() {
        let db = Db::in_memory().await.unwrap();
        let filter = DefaultVisibility::new(db.clone());
        let alice = Account::new_local("https://example.org", "alice");
        let bob = Account::new_local("https://example.org", "bob");

        db.insert_block(&Block {
            id: new_id(),
            uri: "https://example.org/blocks/1".to_string(),
            account_id: alice.id.clone(),
            target_account_id: bob.id.clone(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        let status = note(&alice, "hi");
        assert!(!filter.is_visible(Some(&bob), &status).await.unwrap());
    }
}
