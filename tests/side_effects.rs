/// End-to-end flows through the processor, the worker pools and the scheduler
use chrono::{Duration as ChronoDuration, Utc};
use courier::config::ServerConfig;
use courier::db::Db;
use courier::federation::RecordingFederator;
use courier::messages::{ActivityType, ObjectType};
use courier::model::{new_id, Account, Bookmark, StatusCreateRequest, StatusEditRequest};
use courier::processing::account::CleanupStep;
use courier::{AppContext, CourierError, Processor};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    ctx: AppContext,
    processor: Processor,
    federator: Arc<RecordingFederator>,
}

impl Harness {
    async fn start(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let mut config = ServerConfig::default();
        configure(&mut config);

        let db = Db::in_memory().await.unwrap();
        let federator = Arc::new(RecordingFederator::new());
        let ctx = AppContext::with_parts(config, db, federator.clone());
        let processor = Processor::new(ctx.clone());
        processor.start();

        Self {
            ctx,
            processor,
            federator,
        }
    }

    async fn account(&self, username: &str) -> Account {
        let account = Account::new_local("http://localhost", username);
        self.ctx.db.insert_account(&account).await.unwrap();
        account
    }

    async fn settle(&self) {
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

    fn delivered_kinds(&self) -> Vec<(ActivityType, ObjectType)> {
        self.federator
            .delivered()
            .iter()
            .map(|a| (a.activity_type, a.object_type))
            .collect()
    }
}

fn text(status: &str) -> StatusCreateRequest {
    StatusCreateRequest {
        status: status.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_edits_build_history_and_federate_updates() {
    let h = Harness::start(|_| {}).await;
    let alice = h.account("alice").await;

    let status = h.processor.status.create(&alice, text("first")).await.unwrap();
    for body in ["second", "third"] {
        h.processor
            .status
            .edit(
                &alice,
                &status.id,
                StatusEditRequest {
                    status: body.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
    h.settle().await;

    let history = h.processor.status.history(Some(&alice), &status.id).await.unwrap();
    let contents: Vec<_> = history.iter().map(|r| r.content.clone()).collect();
    assert_eq!(contents.len(), 3);
    assert!(contents[0].contains("first"));
    assert!(contents[1].contains("second"));
    assert!(contents[2].contains("third"));
    assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    assert_eq!(
        h.delivered_kinds(),
        vec![
            (ActivityType::Create, ObjectType::Note),
            (ActivityType::Update, ObjectType::Note),
            (ActivityType::Update, ObjectType::Note),
        ]
    );

    h.processor.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pins_respect_limit() {
    let h = Harness::start(|c| c.statuses.max_pinned = 3).await;
    let alice = h.account("alice").await;

    let mut ids = Vec::new();
    for i in 0..6 {
        let status = h
            .processor
            .status
            .create(&alice, text(&format!("status {}", i)))
            .await
            .unwrap();
        ids.push(status.id);
    }
    h.settle().await;

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let processor = h.processor.clone();
            let alice = alice.clone();
            tokio::spawn(async move { processor.status.pin(&alice, &id).await })
        })
        .collect();

    let mut pinned = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => pinned += 1,
            Err(e) => assert!(matches!(e, CourierError::Unprocessable(_))),
        }
    }
    assert_eq!(pinned, 3);

    let stored = h.ctx.db.get_account(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.pinned_count, 3);
    assert_eq!(stored.statuses_count, 6);
    assert_eq!(h.ctx.db.pinned_statuses(&alice.id).await.unwrap().len(), 3);

    h.processor.stop().await;
}

#[tokio::test]
async fn test_cascade_reports_failed_step_and_continues() {
    let h = Harness::start(|_| {}).await;
    let alice = h.account("alice").await;
    let bob = h.account("bob").await;

    let status = h.processor.status.create(&bob, text("bookmark me")).await.unwrap();
    h.settle().await;
    h.ctx
        .db
        .insert_bookmark(&Bookmark {
            id: new_id(),
            account_id: alice.id.clone(),
            status_id: status.id.clone(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    h.processor.account.follow(&alice, &bob.id).await.unwrap();
    h.settle().await;

    sqlx::query("DROP TABLE bookmarks")
        .execute(h.ctx.db.pool())
        .await
        .unwrap();

    let report = h.processor.account.delete_cascade(&alice).await;
    assert_eq!(report.failed_steps(), vec![CleanupStep::Bookmarks]);
    assert!(!report.is_complete());
    assert_eq!(report.steps.len(), CleanupStep::ALL.len());

    // Later steps still ran
    assert!(h.ctx.db.get_account(&alice.id).await.unwrap().is_none());
    assert!(h.ctx.db.get_follow(&alice.id, &bob.id).await.unwrap().is_none());

    h.processor.stop().await;
}

#[tokio::test]
async fn test_scheduled_status_is_published() {
    let h = Harness::start(|c| c.scheduled.min_delay_secs = 0).await;
    let alice = h.account("alice").await;

    let fire_at = Utc::now() + ChronoDuration::milliseconds(500);
    let draft = h
        .processor
        .status
        .schedule(&alice, fire_at, text("from the past"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.settle().await;

    assert!(h.ctx.db.get_scheduled_status(&draft.id).await.unwrap().is_none());
    let published = h.ctx.db.get_status(&draft.id).await.unwrap().unwrap();
    assert!(published.content.contains("from the past"));

    let stored = h.ctx.db.get_account(&alice.id).await.unwrap().unwrap();
    assert_eq!(stored.statuses_count, 1);
    assert_eq!(h.delivered_kinds(), vec![(ActivityType::Create, ObjectType::Note)]);

    h.processor.stop().await;
}

#[tokio::test]
async fn test_deleting_scheduled_status_cancels_publication() {
    let h = Harness::start(|c| c.scheduled.min_delay_secs = 0).await;
    let alice = h.account("alice").await;

    let draft = h
        .processor
        .status
        .schedule(&alice, Utc::now() + ChronoDuration::milliseconds(300), text("never"))
        .await
        .unwrap();
    h.processor.status.delete_scheduled(&alice, &draft.id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(800)).await;
    h.settle().await;

    assert!(h.ctx.db.get_status(&draft.id).await.unwrap().is_none());
    assert!(h.federator.delivered().is_empty());

    h.processor.stop().await;
}
