//! In-process push hub.
//!
//! One `broadcast` channel per connected user, created on first subscribe
//! and dropped once the last receiver goes away. Events published for a
//! user with no open socket are discarded; the stored notification row is
//! the durable copy.

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::PUSH_CHANNEL_CAPACITY;
use crate::domain::PushEvent;

pub struct NotificationHub {
    channels: DashMap<Uuid, broadcast::Sender<PushEvent>>,
    capacity: usize,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(PUSH_CHANNEL_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Open a receiver for `user_id`.
    pub fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<PushEvent> {
        self.channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver `event` to every open receiver of `user_id`.
    ///
    /// Returns how many receivers got it; zero when the user is offline.
    pub fn publish(&self, user_id: Uuid, event: PushEvent) -> usize {
        let delivered = match self.channels.get(&user_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            self.prune(user_id);
        }
        delivered
    }

    /// Drop the channel once nobody listens. Called by sockets on close.
    pub fn prune(&self, user_id: Uuid) {
        self.channels
            .remove_if(&user_id, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of users with an open channel
    pub fn connected_users(&self) -> usize {
        self.channels.len()
    }
}
