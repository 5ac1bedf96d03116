//! Live danmaku client: the session state machine
//!
//! ```text
//! Idle ─start─▶ resolve ─▶ Connecting ─AUTH ok─▶ Connected
//!                 │              ▲                   │ close / failure
//!                 ▼              │                   ▼
//!               Error      Reconnecting ◀──backoff── Disconnected
//! ```
//!
//! `stop()` returns to idle from any state.

use barrage_core::{
    normalize_hosts, parse_command, AuthRequest, ConnectionInfo, ConnectionState, Event,
    HostDescriptor, Operation, ProtocolVersion,
};
use barrage_transport::{Transport, TransportEvent, TransportReceiver, TransportSender};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::builder::LiveDanmakuClientBuilder;
use crate::config::ClientConfig;
use crate::dispatch::{DispatchContext, DispatchPipeline, SessionSignal};
use crate::error::{ClientError, Result};
use crate::heartbeat::{self, HeartbeatTiming};
use crate::listener::Listener;
use crate::resolver::ConnectionInfoResolver;
use crate::session::ConnectionSession;

/// Close code for a client-initiated shutdown
pub const CLOSE_NORMAL: u16 = 1000;

/// Reason reported in the final `Disconnected` state after `stop()`
pub const STOPPED_REASON: &str = "stopped";

/// A live danmaku client for one room
pub struct LiveDanmakuClient<T: Transport> {
    inner: Arc<Inner<T>>,
    run: Mutex<Option<RunHandle>>,
}

struct Inner<T: Transport> {
    room_id: u64,
    config: ClientConfig,
    transport: T,
    resolver: Arc<dyn ConnectionInfoResolver>,
    listener: Arc<dyn Listener>,
}

struct RunHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// How one connection attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOutcome {
    Closed,
    Stopped,
}

impl<T: Transport> LiveDanmakuClient<T> {
    /// Create a client (use the builder for config)
    pub fn new(
        room_id: u64,
        config: ClientConfig,
        transport: T,
        resolver: Arc<dyn ConnectionInfoResolver>,
        listener: Arc<dyn Listener>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                room_id,
                config,
                transport,
                resolver,
                listener,
            }),
            run: Mutex::new(None),
        }
    }

    /// Create a builder
    pub fn builder(room_id: u64) -> LiveDanmakuClientBuilder {
        LiveDanmakuClientBuilder::new(room_id)
    }

    pub fn room_id(&self) -> u64 {
        self.inner.room_id
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Whether a session is running and has not been asked to stop
    pub fn is_running(&self) -> bool {
        self.run.lock().as_ref().is_some_and(RunHandle::is_active)
    }

    /// Start the session. No-op if one is already running.
    ///
    /// A run that is still tearing down after `stop()` finishes first, so its
    /// final state always precedes the new run's `Connecting`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut run = self.run.lock();
        if run.as_ref().is_some_and(RunHandle::is_active) {
            debug!("Client for room {} already running", self.inner.room_id);
            return;
        }

        let previous = run.take().map(|old| old.task);
        let (stop_tx, stop_rx) = watch::channel(false);
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            inner.run(StopSignal { rx: stop_rx }).await;
        });

        *run = Some(RunHandle { stop_tx, task });
    }

    /// Stop the session. Idempotent, returns immediately.
    ///
    /// The session task closes any open connection and exits on its own; no
    /// further connection attempts are made.
    pub fn stop(&self) {
        if let Some(run) = self.run.lock().as_ref() {
            if !*run.stop_tx.borrow() {
                info!("Stopping client for room {}", self.inner.room_id);
                run.stop_tx.send_replace(true);
            }
        }
    }
}

impl RunHandle {
    fn is_active(&self) -> bool {
        !*self.stop_tx.borrow() && !self.task.is_finished()
    }
}

impl<T: Transport> Drop for LiveDanmakuClient<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Cancellation observed by every wait in the session
struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    fn is_stopped(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once stop is requested (or the client is gone)
    async fn stopped(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

impl<T: Transport> Inner<T> {
    fn emit_state(&self, state: ConnectionState) {
        match &state {
            ConnectionState::Error { message } => error!("Room {}: {}", self.room_id, message),
            _ => info!("Room {}: {}", self.room_id, state),
        }
        self.listener.on_state_changed(state);
    }

    async fn run(self: Arc<Self>, mut stop: StopSignal) {
        let resolved = tokio::select! {
            _ = stop.stopped() => {
                self.emit_state(stopped_state());
                return;
            }
            resolved = self.resolver.resolve(self.room_id) => resolved,
        };

        let (info, hosts) = match resolved
            .map_err(|e| ClientError::Resolve(format!("{:#}", e)))
            .and_then(validate_info)
        {
            Ok(valid) => valid,
            Err(e) => {
                self.emit_state(ConnectionState::Error {
                    message: e.to_string(),
                });
                return;
            }
        };

        info!(
            "Room {} resolved to {} with {} host(s)",
            self.room_id,
            info.room_id,
            hosts.len()
        );

        let mut pipeline = DispatchPipeline::new(self.config.queue_capacity);
        let mut attempt: u32 = 0;
        let mut host_index: usize = 0;

        while !stop.is_stopped() {
            let host = &hosts[host_index % hosts.len()];

            if attempt == 0 {
                self.emit_state(ConnectionState::Connecting);
            } else {
                let delay = self.config.backoff.delay(attempt);
                self.emit_state(ConnectionState::Reconnecting {
                    attempt,
                    delay_ms: delay.as_millis() as u64,
                });
                tokio::select! {
                    _ = stop.stopped() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let outcome = self.run_attempt(&info, host, &mut pipeline, &mut stop).await;
            if outcome == AttemptOutcome::Stopped {
                break;
            }

            attempt = attempt.saturating_add(1);
            host_index = host_index.wrapping_add(1);
        }

        pipeline.stop();
        self.emit_state(stopped_state());
    }

    /// One connection attempt, from open to close.
    async fn run_attempt(
        &self,
        info: &ConnectionInfo,
        host: &HostDescriptor,
        pipeline: &mut DispatchPipeline,
        stop: &mut StopSignal,
    ) -> AttemptOutcome {
        let session = Arc::new(ConnectionSession::new(host.clone()));
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();

        pipeline.start(DispatchContext {
            session: session.clone(),
            listener: self.listener.clone(),
            signals: signal_tx.clone(),
        });

        let url = host.url(&self.config.ws_scheme, &self.config.ws_path);
        let connected = tokio::select! {
            _ = stop.stopped() => {
                pipeline.stop();
                return AttemptOutcome::Stopped;
            }
            connected = self.transport.connect(&url) => connected,
        };

        let (sender, mut receiver) = match connected {
            Ok(pair) => pair,
            Err(e) => {
                warn!("Failed to connect to {}: {}", url, e);
                pipeline.stop();
                self.emit_state(ConnectionState::Disconnected {
                    reason: Some(e.to_string()),
                });
                return AttemptOutcome::Closed;
            }
        };
        let sender = Arc::new(sender);

        if let Err(e) = self.send_auth(info, &session, sender.as_ref()).await {
            warn!("Failed to send auth to {}: {}", host, e);
            pipeline.stop();
            self.emit_state(ConnectionState::Disconnected {
                reason: Some(e.to_string()),
            });
            return AttemptOutcome::Closed;
        }

        let mut heartbeat_task: Option<JoinHandle<()>> = None;

        let outcome = loop {
            tokio::select! {
                biased;

                _ = stop.stopped() => {
                    let _ = sender.close(CLOSE_NORMAL, "stop").await;
                    break AttemptOutcome::Stopped;
                }

                Some(signal) = signal_rx.recv() => match signal {
                    SessionSignal::Verified => {
                        if heartbeat_task.is_none() {
                            heartbeat_task = Some(heartbeat::spawn(
                                session.clone(),
                                sender.clone(),
                                signal_tx.clone(),
                                self.heartbeat_timing(),
                            ));
                        }
                    }
                    SessionSignal::Close { code, reason } => {
                        if let Err(e) = sender.close(code, &reason).await {
                            debug!("Close failed: {}", e);
                        }
                        self.emit_state(ConnectionState::Disconnected { reason: Some(reason) });
                        break AttemptOutcome::Closed;
                    }
                },

                event = receiver.recv() => match event {
                    Some(TransportEvent::Data(chunk)) => pipeline.push(chunk),
                    Some(TransportEvent::Text(text)) => self.handle_text(&session, &text),
                    Some(TransportEvent::Connected) => debug!("Transport open to {}", host),
                    Some(TransportEvent::Error(e)) => warn!("Transport error on {}: {}", host, e),
                    Some(TransportEvent::Disconnected { reason }) => {
                        self.emit_state(ConnectionState::Disconnected { reason });
                        break AttemptOutcome::Closed;
                    }
                    None => {
                        self.emit_state(ConnectionState::Disconnected { reason: None });
                        break AttemptOutcome::Closed;
                    }
                },
            }
        };

        if let Some(task) = heartbeat_task {
            task.abort();
        }
        pipeline.stop();

        outcome
    }

    async fn send_auth<S: TransportSender + ?Sized>(
        &self,
        info: &ConnectionInfo,
        session: &ConnectionSession,
        sender: &S,
    ) -> Result<()> {
        let body = AuthRequest::new(self.config.user_id, info.room_id, &info.token).to_json()?;
        let frame = barrage_core::encode(
            Operation::Auth.code(),
            ProtocolVersion::Heartbeat.code(),
            session.next_sequence(),
            &body,
        )?;
        sender.send(frame).await?;
        debug!("Sent auth for room {} to {}", info.room_id, session.host());
        Ok(())
    }

    /// Text frames bypass the binary codec and are read as a command directly.
    fn handle_text(&self, session: &ConnectionSession, text: &str) {
        if !session.is_verified() {
            return;
        }
        if let Some(event @ Event::Comment(_)) = parse_command(text) {
            self.listener.on_event(event);
        }
    }

    fn heartbeat_timing(&self) -> HeartbeatTiming {
        HeartbeatTiming {
            interval: self.config.heartbeat_interval(),
            timeout: self.config.heartbeat_timeout(),
            verify_poll: self.config.verify_poll(),
        }
    }
}

fn stopped_state() -> ConnectionState {
    ConnectionState::Disconnected {
        reason: Some(STOPPED_REASON.to_string()),
    }
}

/// Blank token or no usable host is fatal for the session
fn validate_info(info: ConnectionInfo) -> Result<(ConnectionInfo, Vec<HostDescriptor>)> {
    let hosts = normalize_hosts(&info.hosts);
    if info.token.trim().is_empty() || hosts.is_empty() {
        return Err(ClientError::EmptyConnectionInfo);
    }
    Ok((info, hosts))
}
