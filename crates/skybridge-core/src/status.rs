// ABOUTME: StatusMessage and StatusFeed, the observable status line shown while a post is processed.
// ABOUTME: The feed keeps the latest message and broadcasts every update to subscribers in order.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 64;

/// One status line. Each new message replaces the previous one on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

/// Shared status store with subscriber notification. Cloning yields another
/// handle onto the same feed.
#[derive(Debug, Clone)]
pub struct StatusFeed {
    tx: broadcast::Sender<StatusMessage>,
    latest: Arc<Mutex<Option<StatusMessage>>>,
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            tx,
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the current status and notify subscribers.
    pub fn publish(&self, message: StatusMessage) {
        tracing::debug!(is_error = message.is_error, "status: {}", message.text);
        {
            let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
            *latest = Some(message.clone());
        }
        // No subscribers is fine; the latest value is still recorded.
        let _ = self.tx.send(message);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.publish(StatusMessage::info(text));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.publish(StatusMessage::error(text));
    }

    /// Receive every message published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusMessage> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<StatusMessage> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
