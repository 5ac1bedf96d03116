//! Per-attempt connection state

use barrage_core::HostDescriptor;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// State for one connection attempt.
///
/// Written by the dispatch worker (verification, acks) and read by the
/// heartbeat task, so every field is atomic.
#[derive(Debug)]
pub struct ConnectionSession {
    host: HostDescriptor,
    sequence: AtomicU32,
    verified: AtomicBool,
    epoch: Instant,
    /// Milliseconds since `epoch` of the last AUTH_REPLY / HEARTBEAT_REPLY
    last_ack_ms: AtomicU64,
}

impl ConnectionSession {
    pub fn new(host: HostDescriptor) -> Self {
        Self {
            host,
            sequence: AtomicU32::new(1),
            verified: AtomicBool::new(false),
            epoch: Instant::now(),
            last_ack_ms: AtomicU64::new(0),
        }
    }

    pub fn host(&self) -> &HostDescriptor {
        &self.host
    }

    /// Next outbound sequence number, starting at 1
    pub fn next_sequence(&self) -> u32 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::Acquire)
    }

    pub fn mark_verified(&self) {
        self.record_ack();
        self.verified.store(true, Ordering::Release);
    }

    /// Refresh the liveness timestamp
    pub fn record_ack(&self) {
        self.last_ack_ms
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Release);
    }

    /// Time since the last ack (or since the session began, if none yet)
    pub fn since_last_ack(&self) -> Duration {
        let last = Duration::from_millis(self.last_ack_ms.load(Ordering::Acquire));
        self.epoch.elapsed().saturating_sub(last)
    }
}
