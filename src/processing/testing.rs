/// Shared fixture for processor and handler tests
use super::Processor;
use crate::config::ServerConfig;
use crate::context::AppContext;
use crate::db::Db;
use crate::federation::RecordingFederator;
use crate::messages::Message;
use crate::model::{new_id, Account, Follow, Status, StatusCreateRequest, Visibility};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const BASE_URL: &str = "http://localhost";

pub(crate) struct TestEnv {
    pub ctx: AppContext,
    pub processor: Processor,
    pub federator: Arc<RecordingFederator>,
}

impl TestEnv {
    /// In-memory store, scheduler running, workers not started
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let mut config = ServerConfig::default();
        configure(&mut config);

        let db = Db::in_memory().await.unwrap();
        let federator = Arc::new(RecordingFederator::new());
        let ctx = AppContext::with_parts(config, db, federator.clone());
        let processor = Processor::new(ctx.clone());
        processor.start_scheduler();

        Self {
            ctx,
            processor,
            federator,
        }
    }

    /// Same as `new`, with both worker pools draining their queues
    pub async fn started() -> Self {
        let env = Self::new().await;
        env.processor.start();
        env
    }

    pub async fn local_account(&self, username: &str) -> Account {
        let account = Account::new_local(BASE_URL, username);
        self.ctx.db.insert_account(&account).await.unwrap();
        account
    }

    pub async fn remote_account(&self, username: &str, domain: &str) -> Account {
        let uri = format!("https://{}/users/{}", domain, username);
        let account = Account::new_remote(&uri, username, domain);
        self.ctx.db.insert_account(&account).await.unwrap();
        account
    }

    pub async fn post(&self, author: &Account, text: &str) -> Status {
        self.post_with_visibility(author, text, Visibility::Public).await
    }

    pub async fn post_with_visibility(
        &self,
        author: &Account,
        text: &str,
        visibility: Visibility,
    ) -> Status {
        self.processor
            .status
            .create(
                author,
                StatusCreateRequest {
                    status: text.to_string(),
                    visibility,
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    /// Store an established follow without going through the processor
    pub async fn follow(&self, follower: &Account, target: &Account) -> Follow {
        let id = new_id();
        let follow = Follow {
            uri: format!("{}/follows/{}", follower.uri, id),
            id,
            account_id: follower.id.clone(),
            target_account_id: target.id.clone(),
            created_at: Utc::now(),
        };
        self.ctx.db.insert_follow(&follow).await.unwrap();
        follow
    }

    /// Everything queued on the client worker so far
    pub fn drain_client(&self) -> Vec<Message> {
        std::iter::from_fn(|| self.ctx.workers.client.queue().try_pop()).collect()
    }

    pub fn drain_federator(&self) -> Vec<Message> {
        std::iter::from_fn(|| self.ctx.workers.federator.queue().try_pop()).collect()
    }

    /// Wait until both queues are empty and in-flight handlers had a chance to finish
    pub async fn settle(&self) {
        // Handlers may route follow-up messages, so wait for two quiet checks in a row
        for _ in 0..400 {
            let idle = self.ctx.workers.client.queue().is_empty()
                && self.ctx.workers.federator.queue().is_empty();
            tokio::time::sleep(Duration::from_millis(if idle { 50 } else { 5 })).await;
            if idle
                && self.ctx.workers.client.queue().is_empty()
                && self.ctx.workers.federator.queue().is_empty()
            {
                break;
            }
        }
    }
}
