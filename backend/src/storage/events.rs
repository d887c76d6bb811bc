//! # Store Change Notifications
//!
//! Broadcast bus the repositories publish on after a write has landed on
//! disk. Readers (presentation layer, statistics) subscribe and re-run
//! their derivations when a collection they depend on changes; the
//! rotation engine itself never subscribes to anything.

use log::debug;
use tokio::sync::broadcast;

/// Which record collection changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// The kid roster changed (create, update, or delete)
    KidsChanged,
    /// A session was appended to the history
    SessionsChanged,
    /// The rotation state singleton was written
    RotationStateChanged,
}

/// Cloneable handle to the store's change-notification channel.
///
/// Events are published only after the corresponding file write has
/// completed, so a subscriber that reads on notification observes the
/// committed value. Delivery is at-least-once for live subscribers; a
/// lagged receiver may miss intermediate events but never sees a torn
/// write.
#[derive(Debug, Clone)]
pub struct StoreEvents {
    sender: broadcast::Sender<StoreEvent>,
}

impl StoreEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Publish a change notification. Having no subscribers is normal
    /// (e.g. headless tests), so send errors are ignored.
    pub fn publish(&self, event: StoreEvent) {
        debug!("Publishing store event: {:?}", event);
        let _ = self.sender.send(event);
    }
}

impl Default for StoreEvents {
    fn default() -> Self {
        Self::new()
    }
}
