//! Connection bookkeeping: role attachment on handshake/late auth, and the
//! user→socket map used to target private balance-update events at "the
//! most recent" socket for a user, per the gateway rules.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Guest,
    User,
    Admin,
}

pub struct Connection {
    pub connection_id: Uuid,
    pub role: Role,
    pub user_id: Option<String>,
    pub sender: mpsc::UnboundedSender<Event>,
}

/// Maps a user id to their most-recently-connected socket, for
/// `balance_update` delivery. Multiple sockets per user are allowed; only
/// the latest receives private events.
pub struct ConnectionRegistry {
    primary_socket: DashMap<String, Uuid>,
    connections: DashMap<Uuid, Connection>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self { primary_socket: DashMap::new(), connections: DashMap::new() }
    }

    pub fn register(&self, connection: Connection) {
        if let Some(user_id) = connection.user_id.clone() {
            self.primary_socket.insert(user_id, connection.connection_id);
        }
        self.connections.insert(connection.connection_id, connection);
    }

    pub fn attach_identity(&self, connection_id: Uuid, user_id: String, role: Role) {
        if let Some(mut entry) = self.connections.get_mut(&connection_id) {
            entry.user_id = Some(user_id.clone());
            entry.role = role;
        }
        self.primary_socket.insert(user_id, connection_id);
    }

    pub fn deregister(&self, connection_id: Uuid) {
        if let Some((_, connection)) = self.connections.remove(&connection_id) {
            if let Some(user_id) = connection.user_id {
                // Only clear the primary-socket entry if this was still it;
                // a newer connection for the same user may have superseded it.
                if self.primary_socket.get(&user_id).map(|id| *id) == Some(connection_id) {
                    self.primary_socket.remove(&user_id);
                }
            }
        }
    }

    pub fn role_of(&self, connection_id: Uuid) -> Role {
        self.connections.get(&connection_id).map(|c| c.role).unwrap_or(Role::Guest)
    }

    pub fn user_id_of(&self, connection_id: Uuid) -> Option<String> {
        self.connections.get(&connection_id).and_then(|c| c.user_id.clone())
    }

    /// Deliver a private event to a user's primary socket only, if connected.
    pub fn send_to_user(&self, user_id: &str, event: Event) {
        if let Some(connection_id) = self.primary_socket.get(user_id) {
            if let Some(connection) = self.connections.get(&*connection_id) {
                let _ = connection.sender.send(event);
            }
        }
    }

    /// Deliver to every connected socket, for chat-room fan-out.
    pub fn broadcast(&self, event: Event) {
        for connection in self.connections.iter() {
            let _ = connection.sender.send(event.clone());
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection(user_id: Option<&str>) -> (Connection, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Connection { connection_id: Uuid::new_v4(), role: Role::Guest, user_id: user_id.map(|s| s.to_string()), sender: tx },
            rx,
        )
    }

    #[test]
    fn most_recent_connection_wins_for_balance_updates() {
        let registry = ConnectionRegistry::new();
        let (conn_a, mut rx_a) = test_connection(Some("alice"));
        let (conn_b, mut rx_b) = test_connection(Some("alice"));
        registry.register(conn_a);
        registry.register(conn_b);

        registry.send_to_user("alice", Event::Crashed { round: crate::round::view::RoundView::default() });

        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn deregistering_stale_connection_does_not_clear_newer_primary() {
        let registry = ConnectionRegistry::new();
        let (conn_a, _rx_a) = test_connection(Some("alice"));
        let id_a = conn_a.connection_id;
        let (conn_b, mut rx_b) = test_connection(Some("alice"));
        registry.register(conn_a);
        registry.register(conn_b);

        registry.deregister(id_a);
        registry.send_to_user("alice", Event::Crashed { round: crate::round::view::RoundView::default() });
        assert!(rx_b.try_recv().is_ok());
    }
}
