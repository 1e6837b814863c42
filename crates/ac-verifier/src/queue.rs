//! # Work Queues
//!
//! Unbounded FIFO queues with many producers and one consumer. The engine
//! uses one for outbound verifications and one for diagnostics.
//!
//! The receiving half outlives a single run: each run's consumer task takes
//! an exclusive lease on it, and items left unconsumed at stop are delivered
//! by the next run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};

use crate::domain::OutboundVerification;
use crate::events::DiagnosticEvent;

/// Producer half. Cheap to clone.
#[derive(Debug)]
pub struct QueueSender<T> {
    sender: mpsc::UnboundedSender<T>,
    published: Arc<AtomicU64>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            published: self.published.clone(),
        }
    }
}

impl<T> QueueSender<T> {
    /// Enqueue an item. Never blocks.
    ///
    /// Returns `false` if the receiving half is gone and the item was dropped.
    pub fn publish(&self, item: T) -> bool {
        match self.sender.send(item) {
            Ok(()) => {
                self.published.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                tracing::warn!("Queue receiver dropped; item discarded");
                false
            }
        }
    }

    /// Total items successfully enqueued.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

/// Consumer half, shared so consecutive runs can reuse it.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Take the exclusive consumer lease, waiting for any previous consumer
    /// to release it.
    pub async fn lease(&self) -> OwnedMutexGuard<mpsc::UnboundedReceiver<T>> {
        self.receiver.clone().lock_owned().await
    }

    /// Remove and return everything currently queued.
    pub async fn drain(&self) -> Vec<T> {
        let mut receiver = self.receiver.lock().await;
        let mut items = Vec::new();
        while let Ok(item) = receiver.try_recv() {
            items.push(item);
        }
        items
    }
}

/// Create a connected queue.
pub fn queue<T>() -> (QueueSender<T>, QueueReceiver<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        QueueSender {
            sender,
            published: Arc::new(AtomicU64::new(0)),
        },
        QueueReceiver {
            receiver: Arc::new(Mutex::new(receiver)),
        },
    )
}

pub type OutboundSender = QueueSender<OutboundVerification>;
pub type OutboundReceiver = QueueReceiver<OutboundVerification>;
pub type DiagnosticSender = QueueSender<DiagnosticEvent>;
pub type DiagnosticReceiver = QueueReceiver<DiagnosticEvent>;
