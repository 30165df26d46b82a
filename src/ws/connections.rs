//! Outbound channels for live connections

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use super::protocol::{ConnectionId, ServerMsg};

pub type Outbox = mpsc::UnboundedSender<ServerMsg>;

/// Routes server messages to connection writer tasks
#[derive(Default)]
pub struct ConnectionRegistry {
    outboxes: DashMap<ConnectionId, Outbox>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return the receiving end of its outbox
    pub fn register(&self, connection_id: ConnectionId) -> mpsc::UnboundedReceiver<ServerMsg> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outboxes.insert(connection_id, tx);
        rx
    }

    pub fn unregister(&self, connection_id: ConnectionId) {
        self.outboxes.remove(&connection_id);
    }

    /// Best-effort send; a missing or closed outbox is ignored
    pub fn send(&self, connection_id: ConnectionId, msg: ServerMsg) -> bool {
        let Some(outbox) = self.outboxes.get(&connection_id) else {
            debug!(connection_id = %connection_id, "No outbox for connection, dropping message");
            return false;
        };
        outbox.send(msg).is_ok()
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }
}
