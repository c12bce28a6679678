/// Processing layer
///
/// Synchronous processors validate and commit a mutation, then emit a
/// message; the side-effect handlers in [`effects`] consume those messages
/// on the worker pools. The scheduler fires back into the processors
/// through [`TaskDispatcher`].

pub mod account;
pub mod effects;
pub mod polls;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

use crate::context::AppContext;
use crate::error::CourierResult;
use crate::workers::{ScheduledTask, TaskKind, TaskRunner};
use account::AccountProcessor;
use async_trait::async_trait;
use effects::{ClientApiHandler, FediApiHandler};
use polls::PollProcessor;
use status::StatusProcessor;
use std::sync::Arc;
use tracing::{info, warn};

/// Entry point bundling every processor around one context
#[derive(Clone)]
pub struct Processor {
    pub ctx: AppContext,
    pub account: AccountProcessor,
    pub status: StatusProcessor,
    pub polls: PollProcessor,
}

impl Processor {
    pub fn new(ctx: AppContext) -> Self {
        let polls = PollProcessor::new(ctx.clone());
        let status = StatusProcessor::new(ctx.clone(), polls.clone());
        let account = AccountProcessor::new(ctx.clone());

        Self {
            ctx,
            account,
            status,
            polls,
        }
    }

    /// Bind the side-effect handlers, start the consumer pools and the scheduler
    pub fn start(&self) {
        self.start_scheduler();

        let workers = &self.ctx.workers;
        workers.client.start(
            self.ctx.config.workers.client_workers,
            Arc::new(ClientApiHandler::new(self.clone())),
        );
        workers.federator.start(
            self.ctx.config.workers.federator_workers,
            Arc::new(FediApiHandler::new(self.clone())),
        );
    }

    /// Start only the scheduler, leaving the queues undrained
    pub fn start_scheduler(&self) {
        self.ctx.workers.scheduler.start(Arc::new(TaskDispatcher {
            polls: self.polls.clone(),
            status: self.status.clone(),
        }));
    }

    /// Re-register persisted poll expiries and scheduled statuses
    pub async fn schedule_all(&self) -> CourierResult<()> {
        let polls = self.polls.schedule_all().await?;
        let drafts = self.status.schedule_all_scheduled().await?;
        info!(polls, drafts, "Restored scheduled tasks");
        Ok(())
    }

    /// Stop the scheduler and drain the worker pools
    ///
    /// Handlers hold a clone of the processor; stopping unbinds them and
    /// breaks that cycle.
    pub async fn stop(&self) {
        self.ctx.workers.stop().await;
    }
}

/// Routes fired scheduler tasks to the processor owning them
pub struct TaskDispatcher {
    polls: PollProcessor,
    status: StatusProcessor,
}

#[async_trait]
impl TaskRunner for TaskDispatcher {
    async fn run(&self, task: ScheduledTask) -> CourierResult<()> {
        match task.kind {
            TaskKind::ClosePoll { poll_id } => self.polls.close(&poll_id).await,
            TaskKind::PublishStatus {
                scheduled_status_id,
            } => {
                if self
                    .status
                    .publish_scheduled(&scheduled_status_id)
                    .await?
                    .is_none()
                {
                    warn!(scheduled_status = %scheduled_status_id, "Nothing published");
                }
                Ok(())
            }
        }
    }
}
