//! Listener contract and adapters

use barrage_core::{ConnectionState, Event};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receives everything the client reports.
///
/// Called inline from the client's tasks; implementations should return
/// quickly.
pub trait Listener: Send + Sync + 'static {
    fn on_state_changed(&self, state: ConnectionState);

    fn on_event(&self, event: Event);
}

impl<L: Listener + ?Sized> Listener for Arc<L> {
    fn on_state_changed(&self, state: ConnectionState) {
        (**self).on_state_changed(state)
    }

    fn on_event(&self, event: Event) {
        (**self).on_event(event)
    }
}

/// One item delivered through a [`ChannelListener`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNotification {
    State(ConnectionState),
    Event(Event),
}

/// Forwards notifications into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ClientNotification>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Listener for ChannelListener {
    fn on_state_changed(&self, state: ConnectionState) {
        let _ = self.tx.send(ClientNotification::State(state));
    }

    fn on_event(&self, event: Event) {
        let _ = self.tx.send(ClientNotification::Event(event));
    }
}

/// Default level used when the filter is enabled with level 0
pub const DEFAULT_RECOMMEND_LEVEL: u8 = 3;

/// Drops comments whose upstream moderation score is below a threshold.
///
/// States and popularity updates always pass through.
#[derive(Debug, Clone)]
pub struct RecommendScoreFilter<L> {
    inner: L,
    level: u8,
}

impl<L: Listener> RecommendScoreFilter<L> {
    pub fn new(inner: L, level: u8) -> Self {
        let level = if level == 0 {
            DEFAULT_RECOMMEND_LEVEL
        } else {
            level
        };
        Self { inner, level }
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl<L: Listener> Listener for RecommendScoreFilter<L> {
    fn on_state_changed(&self, state: ConnectionState) {
        self.inner.on_state_changed(state);
    }

    fn on_event(&self, event: Event) {
        if let Event::Comment(comment) = &event {
            if comment.recommend_score < self.level {
                return;
            }
        }
        self.inner.on_event(event);
    }
}
