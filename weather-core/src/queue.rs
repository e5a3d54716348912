//! FIFO hand-off between submitters (UI, timer) and the refresh worker.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::mpsc;
use tracing::warn;

use crate::model::RefreshRequest;

#[derive(Debug)]
pub(crate) enum QueueItem {
    Refresh(RefreshRequest),
    Stop,
}

/// Submit side. Cheap to clone; every clone feeds the same worker.
///
/// Unbounded, no deduplication: the same location submitted twice yields two
/// refresh cycles.
#[derive(Debug, Clone)]
pub struct RefreshQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
    next_seq: Arc<AtomicU64>,
}

/// Worker side of the queue.
#[derive(Debug)]
pub struct RefreshReceiver {
    rx: mpsc::UnboundedReceiver<QueueItem>,
    stopped: bool,
}

/// Create a connected queue pair.
pub fn refresh_queue() -> (RefreshQueue, RefreshReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let queue = RefreshQueue { tx, next_seq: Arc::new(AtomicU64::new(0)) };
    (queue, RefreshReceiver { rx, stopped: false })
}

impl RefreshQueue {
    /// Never blocks. Returns the submission sequence number; if the worker has
    /// already stopped the request is dropped with a warning.
    pub fn enqueue(&self, location: impl Into<String>) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let request = RefreshRequest { location: location.into(), seq };

        if let Err(mpsc::error::SendError(item)) = self.tx.send(QueueItem::Refresh(request)) {
            warn!(?item, "refresh worker is gone, dropping request");
        }
        seq
    }

    /// Ask the worker to stop once everything queued before this call is done.
    pub fn shutdown(&self) {
        if self.tx.send(QueueItem::Stop).is_err() {
            warn!("refresh worker already stopped");
        }
    }
}

impl RefreshReceiver {
    /// Waits for the next request. `None` after a stop request or once every
    /// sender is dropped.
    pub async fn dequeue(&mut self) -> Option<RefreshRequest> {
        if self.stopped {
            return None;
        }
        match self.rx.recv().await? {
            QueueItem::Refresh(request) => Some(request),
            QueueItem::Stop => {
                // Anything submitted after the stop is discarded.
                self.stopped = true;
                self.rx.close();
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_with_sequence_numbers() {
        let (queue, mut rx) = refresh_queue();
        queue.enqueue("London");
        queue.enqueue("Paris");
        queue.enqueue("London");

        let got: Vec<_> = [
            rx.dequeue().await.unwrap(),
            rx.dequeue().await.unwrap(),
            rx.dequeue().await.unwrap(),
        ]
        .into_iter()
        .map(|r| (r.location, r.seq))
        .collect();

        assert_eq!(
            got,
            vec![("London".to_string(), 0), ("Paris".to_string(), 1), ("London".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn clones_from_many_tasks_keep_per_sender_order() {
        let (queue, mut rx) = refresh_queue();

        let mut handles = Vec::new();
        for t in 0..4 {
            let q = queue.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    q.enqueue(format!("{t}:{i}"));
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        drop(queue);

        let mut seen = Vec::new();
        while let Some(req) = rx.dequeue().await {
            seen.push(req.location);
        }
        assert_eq!(seen.len(), 100);

        for t in 0..4 {
            let mine: Vec<usize> = seen
                .iter()
                .filter_map(|l| l.strip_prefix(&format!("{t}:")))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(mine, (0..25).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn stop_drains_earlier_requests_first() {
        let (queue, mut rx) = refresh_queue();
        queue.enqueue("A");
        queue.shutdown();
        queue.enqueue("B");

        assert_eq!(rx.dequeue().await.unwrap().location, "A");
        assert!(rx.dequeue().await.is_none());
        assert!(rx.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn enqueue_after_receiver_dropped_does_not_panic() {
        let (queue, rx) = refresh_queue();
        drop(rx);
        assert_eq!(queue.enqueue("Nowhere"), 0);
        queue.shutdown();
    }
}
