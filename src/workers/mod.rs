/// Asynchronous backbone: message queues, worker pools and the scheduler
///
/// Client-originated messages (local origin) and federation-originated
/// messages (remote origin) are drained by separate pools, so a burst of
/// inbound federation traffic never delays local timelines.

pub mod queue;
pub mod scheduler;
pub mod worker;

pub use queue::MessageQueue;
pub use scheduler::{ScheduledTask, Scheduler, TaskKind, TaskRunner};
pub use worker::{MessageHandler, Worker};

use crate::error::CourierResult;
use crate::messages::Message;

pub struct Workers {
    /// Side effects of local mutations
    pub client: Worker,
    /// Side effects of inbound federation
    pub federator: Worker,
    pub scheduler: Scheduler,
}

impl Workers {
    pub fn new() -> Self {
        Self {
            client: Worker::new("client"),
            federator: Worker::new("federator"),
            scheduler: Scheduler::new(),
        }
    }

    /// Queue `msg` on the worker matching its origin
    pub fn route(&self, msg: Message) {
        if msg.is_local_origin() {
            self.client.push(Some(msg));
        } else {
            self.federator.push(Some(msg));
        }
    }

    /// Run `msg` inline on the worker matching its origin
    pub async fn process(&self, msg: Message) -> CourierResult<()> {
        if msg.is_local_origin() {
            self.client.process(msg).await
        } else {
            self.federator.process(msg).await
        }
    }

    /// Stop the scheduler first so fired tasks cannot queue onto stopped workers
    pub async fn stop(&self) {
        self.scheduler.stop();
        self.client.stop().await;
        self.federator.stop().await;
    }
}

impl Default for Workers {
    fn default() -> Self {
        Self::new()
    }
}
