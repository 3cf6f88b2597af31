//! Outbound routing from the simulation to live connections

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use super::protocol::ServerMsg;

/// Connection identity; a connection's player shares the id
pub type ConnectionId = Uuid;

/// Serialized frame shared by every recipient of one fan-out
pub type Frame = Arc<str>;

/// Outbound queue depth per connection before frames are dropped
pub const OUTBOUND_CAPACITY: usize = 256;

/// Live connections and their outbound queues
pub struct ConnectionHub {
    connections: DashMap<ConnectionId, mpsc::Sender<Frame>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection and return the receiving end of its outbound queue
    pub fn register(&self, id: ConnectionId) -> mpsc::Receiver<Frame> {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        self.connections.insert(id, tx);
        rx
    }

    pub fn unregister(&self, id: &ConnectionId) {
        self.connections.remove(id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn send_to(&self, id: &ConnectionId, msg: &ServerMsg) {
        if let Some(frame) = encode(msg) {
            self.push(id, frame);
        }
    }

    pub fn send_to_many<'a>(&self, ids: impl IntoIterator<Item = &'a ConnectionId>, msg: &ServerMsg) {
        let mut ids = ids.into_iter().peekable();
        if ids.peek().is_none() {
            return;
        }
        if let Some(frame) = encode(msg) {
            for id in ids {
                self.push(id, frame.clone());
            }
        }
    }

    /// Deliver to every live connection
    pub fn broadcast_all(&self, msg: &ServerMsg) {
        if let Some(frame) = encode(msg) {
            for entry in self.connections.iter() {
                if entry.value().try_send(frame.clone()).is_err() {
                    debug!(connection_id = %entry.key(), "Dropped broadcast frame");
                }
            }
        }
    }

    /// Fire and forget: a full or closed queue drops the frame
    fn push(&self, id: &ConnectionId, frame: Frame) {
        let Some(tx) = self.connections.get(id) else {
            return;
        };
        if tx.try_send(frame).is_err() {
            debug!(connection_id = %id, "Dropped outbound frame");
        }
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(msg: &ServerMsg) -> Option<Frame> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Arc::from(json)),
        Err(e) => {
            error!(error = %e, "Failed to serialize server message");
            None
        }
    }
}
