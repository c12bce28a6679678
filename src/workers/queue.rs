/// FIFO message queue shared by many producers and one consumer pool
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Ordered holding area for pending work items
///
/// `push` never waits on consumers. A batch handed to one `push` call is
/// appended under a single lock, so it stays contiguous and ordered even
/// when other producers push concurrently.
pub struct MessageQueue<T> {
    name: &'static str,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

impl<T> MessageQueue<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            items: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append items to the tail, preserving their relative order
    pub fn push<I>(&self, batch: I)
    where
        I: IntoIterator<Item = T>,
    {
        let pushed = {
            let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
            let before = items.len();
            items.extend(batch);
            let len = items.len();
            crate::metrics::QUEUE_DEPTH
                .with_label_values(&[self.name])
                .set(len as i64);
            len - before
        };

        for _ in 0..pushed {
            self.notify.notify_one();
        }
    }

    /// Pop without waiting
    pub fn try_pop(&self) -> Option<T> {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        let item = items.pop_front();
        if item.is_some() {
            crate::metrics::QUEUE_DEPTH
                .with_label_values(&[self.name])
                .set(items.len() as i64);
        }
        item
    }

    /// Wait for the next item, or return None once `cancel` fires
    pub async fn pop(&self, cancel: &CancellationToken) -> Option<T> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }

            if let Some(item) = self.try_pop() {
                return Some(item);
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = cancel.cancelled() => return None,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MessageQueue::new("test_fifo");
        queue.push(vec!["m1", "m2", "m3"]);

        let cancel = CancellationToken::new();
        assert_eq!(queue.pop(&cancel).await, Some("m1"));
        assert_eq!(queue.pop(&cancel).await, Some("m2"));
        assert_eq!(queue.pop(&cancel).await, Some("m3"));
        assert!(queue.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_stay_contiguous() {
        let queue = Arc::new(MessageQueue::new("test_batches"));

        let mut producers = Vec::new();
        for producer in 0..8u32 {
            let queue = Arc::clone(&queue);
            producers.push(tokio::spawn(async move {
                let batch: Vec<(u32, u32)> = (0..50).map(|seq| (producer, seq)).collect();
                queue.push(batch);
            }));
        }
        futures::future::join_all(producers).await;

        let mut drained = Vec::new();
        while let Some(item) = queue.try_pop() {
            drained.push(item);
        }
        assert_eq!(drained.len(), 400);

        // Each batch occupies 50 consecutive slots, in order
        for chunk in drained.chunks(50) {
            let producer = chunk[0].0;
            for (expected, item) in chunk.iter().enumerate() {
                assert_eq!(*item, (producer, expected as u32));
            }
        }
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = Arc::new(MessageQueue::new("test_wake"));
        let cancel = CancellationToken::new();

        let consumer = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.pop(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push(Some(42));

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake")
            .unwrap();
        assert_eq!(popped, Some(42));
    }

    #[tokio::test]
    async fn test_pop_returns_none_on_cancel() {
        let queue: Arc<MessageQueue<u8>> = Arc::new(MessageQueue::new("test_cancel"));
        let cancel = CancellationToken::new();

        let consumer = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.pop(&cancel).await })
        };

        cancel.cancel();
        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("cancel should unblock pop")
            .unwrap();
        assert_eq!(popped, None);
    }
}
