//! Session registry: username to notification-channel bindings
//!
//! One binding per logged-in user. The registry never blocks on
//! delivery: events go through an unbounded sender, and a failed send
//! (receiver gone) evicts the binding so later sends stop trying.

use log::{debug, warn};
use shared::ServerEvent;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};

/// Handle used to push events at one connected client.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Default)]
pub struct SessionRegistry {
    channels: RwLock<HashMap<String, EventSender>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a user's notification channel, replacing any stale binding
    /// left by a previous connection.
    pub async fn bind(&self, username: &str, sender: EventSender) {
        let mut channels = self.channels.write().await;
        if channels.insert(username.to_string(), sender).is_some() {
            debug!("Replaced notification binding for {}", username);
        }
    }

    /// Drops a user's binding. Harmless if none exists.
    pub async fn unbind(&self, username: &str) {
        self.channels.write().await.remove(username);
    }

    pub async fn is_connected(&self, username: &str) -> bool {
        self.channels.read().await.contains_key(username)
    }

    /// A clone of the user's sender, if one is bound. Callers that need
    /// to deliver outside a lock take the clone and send afterwards.
    pub async fn sender(&self, username: &str) -> Option<EventSender> {
        self.channels.read().await.get(username).cloned()
    }

    /// Best-effort delivery of one event. Returns whether the event was
    /// handed to a live channel; a dead channel is evicted.
    pub async fn send(&self, username: &str, event: ServerEvent) -> bool {
        let Some(sender) = self.sender(username).await else {
            return false;
        };
        if sender.send(event).is_ok() {
            true
        } else {
            warn!("Dropping dead notification channel for {}", username);
            self.unbind(username).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_and_send() {
        let registry = SessionRegistry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        registry.bind("alice", tx).await;
        assert!(registry.is_connected("alice").await);

        let delivered = registry
            .send(
                "alice",
                ServerEvent::ChatMessage {
                    from: "bob".to_string(),
                    text: "hi".to_string(),
                },
            )
            .await;
        assert!(delivered);

        match rx.recv().await {
            Some(ServerEvent::ChatMessage { from, text }) => {
                assert_eq!(from, "bob");
                assert_eq!(text, "hi");
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_to_unknown_user() {
        let registry = SessionRegistry::new();
        let delivered = registry
            .send(
                "ghost",
                ServerEvent::Kicked {
                    reason: "test".to_string(),
                },
            )
            .await;
        assert!(!delivered);
    }

    #[tokio::test]
    async fn test_dead_channel_is_evicted() {
        let registry = SessionRegistry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.bind("alice", tx).await;
        drop(rx);

        let delivered = registry
            .send(
                "alice",
                ServerEvent::Kicked {
                    reason: "test".to_string(),
                },
            )
            .await;
        assert!(!delivered);
        assert!(!registry.is_connected("alice").await);
    }

    #[tokio::test]
    async fn test_rebind_replaces_channel() {
        let registry = SessionRegistry::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();

        registry.bind("alice", old_tx).await;
        registry.bind("alice", new_tx).await;

        registry
            .send(
                "alice",
                ServerEvent::GameStarting {
                    code: "ABC123".to_string(),
                },
            )
            .await;

        assert!(new_rx.recv().await.is_some());
        assert!(old_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unbind_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.unbind("nobody").await;
        assert!(!registry.is_connected("nobody").await);
    }
}
