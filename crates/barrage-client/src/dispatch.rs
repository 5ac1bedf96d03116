//! Decode/dispatch pipeline
//!
//! Raw chunks from the transport go into a [`DropOldestQueue`]. A single
//! worker drains it in FIFO order, decodes each chunk and turns frames into
//! listener calls. Anything that needs the session loop (starting the
//! heartbeat, closing the socket) is sent back as a [`SessionSignal`].

use barrage_core::{
    auth_reply_code, decode_all, parse_command, ConnectionState, Event, Frame, Operation,
};
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::listener::Listener;
use crate::queue::DropOldestQueue;
use crate::session::ConnectionSession;

/// Close code sent when the server rejects AUTH
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Requests from the pipeline or heartbeat to the session loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionSignal {
    /// AUTH accepted; start the heartbeat
    Verified,
    /// Close the transport locally
    Close { code: u16, reason: String },
}

/// Everything the worker needs for one connection attempt
#[derive(Clone)]
pub(crate) struct DispatchContext {
    pub session: Arc<ConnectionSession>,
    pub listener: Arc<dyn Listener>,
    pub signals: mpsc::UnboundedSender<SessionSignal>,
}

pub struct DispatchPipeline {
    queue: Arc<DropOldestQueue<Bytes>>,
    worker: Option<JoinHandle<()>>,
}

impl DispatchPipeline {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(DropOldestQueue::new(capacity)),
            worker: None,
        }
    }

    pub fn queue(&self) -> &Arc<DropOldestQueue<Bytes>> {
        &self.queue
    }

    /// Hand a raw chunk to the worker; never blocks
    pub fn push(&self, chunk: Bytes) {
        self.queue.push(chunk);
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    pub(crate) fn start(&mut self, ctx: DispatchContext) {
        if self.is_running() {
            return;
        }
        let queue = self.queue.clone();
        self.worker = Some(tokio::spawn(async move {
            loop {
                let chunk = queue.recv().await;
                dispatch_chunk(&ctx, &chunk);
            }
        }));
    }

    /// Cancel the worker, then discard anything still queued
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
        let drained = self.queue.drain();
        if drained > 0 {
            debug!("Discarded {} undispatched chunks", drained);
        }
    }
}

impl Drop for DispatchPipeline {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

pub(crate) fn dispatch_chunk(ctx: &DispatchContext, chunk: &[u8]) {
    for frame in decode_all(chunk) {
        dispatch_frame(ctx, &frame);
    }
}

fn dispatch_frame(ctx: &DispatchContext, frame: &Frame) {
    match frame.op() {
        Some(Operation::AuthReply) => handle_auth_reply(ctx, frame),
        Some(Operation::HeartbeatReply) => handle_heartbeat_reply(ctx, frame),
        Some(Operation::Command) => handle_command(ctx, frame),
        _ => trace!("Ignoring frame with op {}", frame.operation),
    }
}

fn handle_auth_reply(ctx: &DispatchContext, frame: &Frame) {
    let code = auth_reply_code(&frame.body);
    if code == 0 {
        ctx.session.mark_verified();
        ctx.listener.on_state_changed(ConnectionState::Connected {
            host: ctx.session.host().host.clone(),
        });
        let _ = ctx.signals.send(SessionSignal::Verified);
    } else {
        warn!("Auth rejected by {} (code {})", ctx.session.host(), code);
        let _ = ctx.signals.send(SessionSignal::Close {
            code: CLOSE_POLICY_VIOLATION,
            reason: "auth failed".to_string(),
        });
    }
}

fn handle_heartbeat_reply(ctx: &DispatchContext, frame: &Frame) {
    ctx.session.record_ack();

    if let Some(bytes) = frame.body.get(..4) {
        let value = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        ctx.listener.on_event(Event::PopularityUpdate { value });
    }
}

fn handle_command(ctx: &DispatchContext, frame: &Frame) {
    if !ctx.session.is_verified() {
        trace!("Command before auth, dropping");
        return;
    }
    let json = String::from_utf8_lossy(&frame.body);
    match parse_command(&json) {
        Some(event) => ctx.listener.on_event(event),
        None => trace!("Unhandled command ({} bytes)", frame.body.len()),
    }
}
