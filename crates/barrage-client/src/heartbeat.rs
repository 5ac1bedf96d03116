//! Heartbeat loop

use barrage_core::{encode, Operation, ProtocolVersion};
use barrage_transport::TransportSender;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::dispatch::SessionSignal;
use crate::session::ConnectionSession;

/// Close code sent when the peer stops answering heartbeats
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Close reason when no reply arrived within the timeout
pub const HEARTBEAT_TIMEOUT: &str = "heartbeat timeout";

/// Close reason when a heartbeat could not be sent
pub const HEARTBEAT_SEND_FAILED: &str = "heartbeat send failed";

#[derive(Debug, Clone, Copy)]
pub(crate) struct HeartbeatTiming {
    pub interval: Duration,
    pub timeout: Duration,
    pub verify_poll: Duration,
}

/// Spawn the heartbeat for one session.
///
/// Sends an empty HEARTBEAT every `interval`, first tick immediately. Before
/// each send the time since the last reply is checked; past `timeout` the
/// loop asks the session to close instead of sending. A failed send also
/// closes the session, since liveness can no longer be checked.
pub(crate) fn spawn<S>(
    session: Arc<ConnectionSession>,
    sender: Arc<S>,
    signals: mpsc::UnboundedSender<SessionSignal>,
    timing: HeartbeatTiming,
) -> JoinHandle<()>
where
    S: TransportSender + ?Sized + 'static,
{
    tokio::spawn(async move {
        while !session.is_verified() {
            tokio::time::sleep(timing.verify_poll).await;
        }

        let mut ticker = tokio::time::interval(timing.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let silent_for = session.since_last_ack();
            if silent_for > timing.timeout {
                warn!(
                    "No heartbeat reply from {} for {:?}, closing",
                    session.host(),
                    silent_for
                );
                let _ = signals.send(SessionSignal::Close {
                    code: CLOSE_GOING_AWAY,
                    reason: HEARTBEAT_TIMEOUT.to_string(),
                });
                break;
            }

            let sent = match encode(
                Operation::Heartbeat.code(),
                ProtocolVersion::Heartbeat.code(),
                session.next_sequence(),
                &[],
            ) {
                Ok(frame) => sender.send(frame).await.map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            // Without heartbeats the link can no longer be judged alive.
            if let Err(e) = sent {
                warn!("Heartbeat to {} failed: {}, closing", session.host(), e);
                let _ = signals.send(SessionSignal::Close {
                    code: CLOSE_GOING_AWAY,
                    reason: HEARTBEAT_SEND_FAILED.to_string(),
                });
                break;
            }
        }
    })
}
