/// Real-time push channel
///
/// The transport (WebSocket layer) registers a sender per connected user;
/// delivery is push-or-drop with no queuing, confirmation, or retry. A user
/// without an active connection simply misses the real-time copy — the
/// persisted notification remains the source of truth.
use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc;

/// One outbound real-time event
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub event: String,
    pub payload: Value,
}

/// In-memory `user_id → connection` registry
///
/// Connection state is process-local and lost on restart, matching the
/// ephemeral nature of the transport it fronts.
#[derive(Default)]
pub struct PushRegistry {
    connections: Mutex<HashMap<i64, mpsc::UnboundedSender<PushMessage>>>,
}

impl PushRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user's connection, returning the receiving half for the
    /// transport to drain. A reconnect replaces the previous sender.
    pub fn register(&self, user_id: i64) -> mpsc::UnboundedReceiver<PushMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.lock().unwrap().insert(user_id, tx);
        tracing::debug!(user_id, "Push connection registered");
        rx
    }

    /// Drops a user's connection on disconnect
    pub fn unregister(&self, user_id: i64) {
        self.connections.lock().unwrap().remove(&user_id);
        tracing::debug!(user_id, "Push connection unregistered");
    }

    /// Fire-and-forget delivery to a user's active connection, if any
    pub fn send(&self, user_id: i64, event: &str, payload: Value) {
        let mut connections = self.connections.lock().unwrap();

        let message = PushMessage {
            event: event.to_string(),
            payload,
        };

        let send_failed = match connections.get(&user_id) {
            Some(tx) => tx.send(message).is_err(),
            None => return,
        };

        // A closed receiver means the transport went away without
        // unregistering; clean the stale entry up here.
        if send_failed {
            connections.remove(&user_id);
            tracing::debug!(user_id, "Dropped stale push connection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_reaches_registered_connection() {
        let registry = PushRegistry::new();
        let mut rx = registry.register(7);

        registry.send(7, "notification", json!({"message": "hello"}));

        let message = rx.recv().await.unwrap();
        assert_eq!(message.event, "notification");
        assert_eq!(message.payload["message"], "hello");
    }

    #[tokio::test]
    async fn test_send_to_absent_user_is_dropped() {
        let registry = PushRegistry::new();
        // No panic, no error: push-or-drop
        registry.send(99, "notification", json!({}));
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let registry = PushRegistry::new();
        let mut rx = registry.register(7);
        registry.unregister(7);

        registry.send(7, "notification", json!({}));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_receiver_is_cleaned_up() {
        let registry = PushRegistry::new();
        let rx = registry.register(7);
        drop(rx);

        registry.send(7, "notification", json!({}));
        assert!(registry.connections.lock().unwrap().get(&7).is_none());
    }

    #[tokio::test]
    async fn test_reconnect_replaces_previous_sender() {
        let registry = PushRegistry::new();
        let mut old_rx = registry.register(7);
        let mut new_rx = registry.register(7);

        registry.send(7, "notification", json!({"n": 1}));

        assert!(old_rx.try_recv().is_err());
        assert_eq!(new_rx.recv().await.unwrap().payload["n"], 1);
    }
}
