//! Bounded drop-oldest hand-off queue
//!
//! Producers never wait: when the queue is full the oldest item is evicted
//! to make room. Eviction and insertion happen under one lock, so a consumer
//! can never observe a queue above capacity or out of FIFO order.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tracing::trace;

pub struct DropOldestQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

impl<T> DropOldestQueue<T> {
    /// Create a queue; capacity is at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push an item, returning the evicted one if the queue was full
    pub fn push(&self, item: T) -> Option<T> {
        let evicted = {
            let mut items = self.items.lock();
            let evicted = if items.len() >= self.capacity {
                items.pop_front()
            } else {
                None
            };
            items.push_back(item);
            evicted
        };

        if evicted.is_some() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            trace!(total, "Queue full, dropped oldest chunk");
        }
        self.notify.notify_one();
        evicted
    }

    /// Take the oldest item without waiting
    pub fn try_recv(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Wait for the next item
    pub async fn recv(&self) -> T {
        loop {
            if let Some(item) = self.try_recv() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    /// Discard everything queued; returns how many items were removed
    pub fn drain(&self) -> usize {
        let mut items = self.items.lock();
        let count = items.len();
        items.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total items evicted since creation
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
