/// Worker pools draining a message queue
use super::queue::MessageQueue;
use crate::error::{CourierError, CourierResult};
use crate::messages::Message;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Side-effect handler bound to a worker
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, msg: &Message) -> CourierResult<()>;
}

/// A queue plus the fixed pool of consumer loops draining it
///
/// Handler failures are logged and counted; the message is dropped.
/// Nothing is retried or requeued.
pub struct Worker {
    name: &'static str,
    queue: Arc<MessageQueue<Message>>,
    handler: RwLock<Option<Arc<dyn MessageHandler>>>,
    cancel: CancellationToken,
    consumers: Mutex<Vec<JoinHandle<()>>>,
}

impl Worker {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            queue: Arc::new(MessageQueue::new(name)),
            handler: RwLock::new(None),
            cancel: CancellationToken::new(),
            consumers: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn queue(&self) -> &MessageQueue<Message> {
        &self.queue
    }

    /// Queue messages for the consumer loops
    pub fn push<I>(&self, msgs: I)
    where
        I: IntoIterator<Item = Message>,
    {
        self.queue.push(msgs);
    }

    /// Bind `handler` and spawn `n` consumer loops
    pub fn start(&self, n: usize, handler: Arc<dyn MessageHandler>) {
        *self.handler.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&handler));

        let mut consumers = self.consumers.lock().unwrap_or_else(|e| e.into_inner());
        for id in 0..n {
            consumers.push(tokio::spawn(consume(
                self.name,
                id,
                Arc::clone(&self.queue),
                Arc::clone(&handler),
                self.cancel.clone(),
            )));
        }

        info!(worker = self.name, consumers = n, "Worker started");
    }

    /// Stop popping and wait for every consumer to finish its current message
    pub async fn stop(&self) {
        self.cancel.cancel();

        let consumers: Vec<_> = self
            .consumers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        for handle in consumers {
            if let Err(e) = handle.await {
                error!(worker = self.name, "Consumer task failed: {}", e);
            }
        }

        *self.handler.write().unwrap_or_else(|e| e.into_inner()) = None;
        info!(
            worker = self.name,
            dropped = self.queue.len(),
            "Worker stopped"
        );
    }

    /// Run the bound handler inline, bypassing the queue
    ///
    /// The outcome is counted but failures are left to the caller to report.
    pub async fn process(&self, msg: Message) -> CourierResult<()> {
        let handler = self
            .handler
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                CourierError::Internal(format!("worker {} has no handler bound", self.name))
            })?;

        run_handler(self.name, handler.as_ref(), &msg).await
    }
}

async fn consume(
    worker: &'static str,
    id: usize,
    queue: Arc<MessageQueue<Message>>,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
) {
    debug!(worker, consumer = id, "Consumer loop running");

    while let Some(msg) = queue.pop(&cancel).await {
        handle_one(worker, handler.as_ref(), &msg).await;
    }

    debug!(worker, consumer = id, "Consumer loop exited");
}

/// Handle a queued message; failures end here, logged and dropped
async fn handle_one(worker: &'static str, handler: &dyn MessageHandler, msg: &Message) {
    if let Err(e) = run_handler(worker, handler, msg).await {
        error!(
            worker,
            activity = %msg.activity_type(),
            object = %msg.object_type(),
            origin = %msg.origin().id,
            target = msg.target().map(|t| t.id.as_str()).unwrap_or(""),
            "Error processing message: {}",
            e
        );
    }
}

async fn run_handler(
    worker: &'static str,
    handler: &dyn MessageHandler,
    msg: &Message,
) -> CourierResult<()> {
    let started = Instant::now();
    let result = handler.handle(msg).await;

    crate::metrics::record_message(
        worker,
        msg.activity_type().as_str(),
        msg.object_type().as_str(),
        result.is_ok(),
        started.elapsed().as_secs_f64(),
    );

    result
}
