//! Connection registry.
//!
//! Answers "what connection currently represents user X" and the inverse,
//! for routing outbound events and cleaning up on disconnect. Owned by the
//! gateway state, created at startup, injected into handlers; empty after a
//! process restart and rebuilt from incoming connections.

use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::{broadcast, mpsc};

use crate::gateway::ServerEvent;

/// Identifier of a single gateway connection.
pub type ConnectionId = String;

/// A live connection: its identifier and the channel used to push events to
/// it.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub connection_id: ConnectionId,
    pub tx: mpsc::UnboundedSender<ServerEvent>,
}

/// In-process mapping from user identity to their current connection.
///
/// Exactly one entry per connected user; the newest connection wins, so a
/// prior connection of the same user silently stops receiving routed
/// messages. Mutations never hold the lock across an await point.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, ConnectionHandle>>,
    online_tx: broadcast::Sender<Vec<String>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (online_tx, _) = broadcast::channel(256);
        Self {
            connections: RwLock::new(HashMap::new()),
            online_tx,
        }
    }

    /// Register a connection for a user, unconditionally overwriting any
    /// prior mapping, and broadcast the updated online set.
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) {
        {
            let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
            connections.insert(user_id.to_string(), handle);
        }
        self.broadcast_online();
    }

    /// The connection currently representing a user, if any. An absent
    /// lookup is a normal outcome (user offline), not an error.
    #[must_use]
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        let connections = self.connections.read().unwrap_or_else(|e| e.into_inner());
        connections.get(user_id).cloned()
    }

    /// Remove the mapping whose current connection equals `connection_id`.
    /// No-op when the connection is stale (already superseded by a newer
    /// registration for the same user).
    pub fn unregister(&self, connection_id: &str) {
        let removed = {
            let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
            let user_id = connections
                .iter()
                .find(|(_, handle)| handle.connection_id == connection_id)
                .map(|(user_id, _)| user_id.clone());

            match user_id {
                Some(user_id) => connections.remove(&user_id).is_some(),
                None => false,
            }
        };

        if removed {
            self.broadcast_online();
        }
    }

    /// The set of currently online users, sorted for stable output.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        let connections = self.connections.read().unwrap_or_else(|e| e.into_inner());
        let mut users: Vec<String> = connections.keys().cloned().collect();
        users.sort();
        users
    }

    /// Subscribe to online-set updates.
    #[must_use]
    pub fn subscribe_online(&self) -> broadcast::Receiver<Vec<String>> {
        self.online_tx.subscribe()
    }

    fn broadcast_online(&self) {
        // No receivers is fine; connections subscribe lazily
        let _ = self.online_tx.send(self.snapshot());
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
