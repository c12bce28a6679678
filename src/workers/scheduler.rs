/// One-shot task scheduler for poll expiry and scheduled publication
///
/// Tasks are plain data. When one fires, the runner bound at `start`
/// looks the entity up again, so a task never acts on stale state.

use crate::error::CourierResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What to do when a task fires
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    ClosePoll { poll_id: String },
    PublishStatus { scheduled_status_id: String },
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ClosePoll { .. } => "close_poll",
            TaskKind::PublishStatus { .. } => "publish_status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    /// At most one pending task per key
    pub key: String,
    pub fire_at: DateTime<Utc>,
    pub kind: TaskKind,
}

impl ScheduledTask {
    pub fn close_poll(poll_id: &str, fire_at: DateTime<Utc>) -> Self {
        Self {
            key: poll_id.to_string(),
            fire_at,
            kind: TaskKind::ClosePoll {
                poll_id: poll_id.to_string(),
            },
        }
    }

    pub fn publish_status(scheduled_status_id: &str, fire_at: DateTime<Utc>) -> Self {
        Self {
            key: scheduled_status_id.to_string(),
            fire_at,
            kind: TaskKind::PublishStatus {
                scheduled_status_id: scheduled_status_id.to_string(),
            },
        }
    }
}

/// Executes fired tasks
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, task: ScheduledTask) -> CourierResult<()>;
}

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    runner: Option<Arc<dyn TaskRunner>>,
    pending: HashMap<String, Pending>,
    next_generation: u64,
}

impl State {
    fn update_gauge(&self) {
        crate::metrics::SCHEDULER_PENDING_TASKS.set(self.pending.len() as i64);
    }
}

#[derive(Clone, Default)]
pub struct Scheduler {
    state: Arc<Mutex<State>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the runner and begin accepting tasks
    pub fn start(&self, runner: Arc<dyn TaskRunner>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.runner = Some(runner);
        info!("Scheduler started");
    }

    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .runner
            .is_some()
    }

    /// Register `task` unless its key is already pending
    ///
    /// Returns false when the key is taken or the scheduler is not running.
    pub fn add_once(&self, task: ScheduledTask) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.runner.is_none() || state.pending.contains_key(&task.key) {
            return false;
        }

        let generation = state.next_generation;
        state.next_generation += 1;

        let delay = (task.fire_at - Utc::now()).to_std().unwrap_or_default();
        let key = task.key.clone();
        debug!(key = %key, kind = task.kind.as_str(), fire_at = %task.fire_at, "Scheduling task");

        let handle = tokio::spawn(fire(Arc::clone(&self.state), generation, delay, task));
        state.pending.insert(key, Pending { generation, handle });
        state.update_gauge();
        true
    }

    /// Remove the pending task for `key`; false if nothing was pending
    pub fn cancel(&self, key: &str) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.pending.remove(key) {
            Some(pending) => {
                pending.handle.abort();
                state.update_gauge();
                debug!(key, "Cancelled scheduled task");
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pending
            .contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pending
            .len()
    }

    /// Abort every pending timer and refuse further registrations
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.runner = None;
        let aborted = state.pending.len();
        for (_, pending) in state.pending.drain() {
            pending.handle.abort();
        }
        state.update_gauge();
        info!(aborted, "Scheduler stopped");
    }
}

async fn fire(
    state: Arc<Mutex<State>>,
    generation: u64,
    delay: std::time::Duration,
    task: ScheduledTask,
) {
    tokio::time::sleep(delay).await;

    let runner = {
        let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
        // Lost a race with cancel + add_once of the same key
        match state.pending.get(&task.key) {
            Some(pending) if pending.generation == generation => {}
            _ => return,
        }
        state.pending.remove(&task.key);
        state.update_gauge();
        match state.runner.clone() {
            Some(runner) => runner,
            None => return,
        }
    };

    crate::metrics::record_task_fired(task.kind.as_str());
    let key = task.key.clone();
    let kind = task.kind.as_str();
    if let Err(e) = runner.run(task).await {
        if e.is_user_facing() {
            warn!(key = %key, kind, "Scheduled task skipped: {}", e);
        } else {
            error!(key = %key, kind, "Scheduled task failed: {}", e);
        }
    }
}
