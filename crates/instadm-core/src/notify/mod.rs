//! Change notifications for the watched store collections.
//!
//! A notification only says "something in this collection changed"; consumers
//! use it as a refetch trigger and never merge its payload into view state.

pub mod hub;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

pub use hub::ChangeHub;

/// Store collections that can be watched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Conversations,
    Messages,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Conversations => crate::constants::CONVERSATIONS_TABLE,
            Collection::Messages => crate::constants::MESSAGES_TABLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row-level change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    /// Full row after the change (inserts and updates)
    #[serde(default)]
    pub new: Option<Value>,
    /// Row before the change, when the store reports it
    #[serde(default)]
    pub old: Option<Value>,
}

impl ChangeEvent {
    pub fn new(collection: Collection, kind: ChangeKind, new: Option<Value>) -> Self {
        Self {
            collection,
            kind,
            new,
            old: None,
        }
    }

    pub fn with_old(mut self, old: Value) -> Self {
        self.old = Some(old);
        self
    }

    /// `conversation_id` of the new row, if present.
    pub fn conversation_ref(&self) -> Option<&str> {
        self.new.as_ref()?.get("conversation_id")?.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("Change feed is closed")]
    Closed,
    #[error("Subscription to {collection:?} rejected: {reason}")]
    Rejected {
        collection: Collection,
        reason: String,
    },
}

/// Source of change notifications.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, collection: Collection) -> Result<Subscription, NotifyError>;
}

type Release = Box<dyn FnOnce() + Send>;

/// Live subscription to one collection.
///
/// Dropping it (or calling [`Subscription::unsubscribe`]) releases the channel
/// exactly once; no event is delivered afterwards.
pub struct Subscription {
    collection: Collection,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    release: Option<Release>,
}

impl Subscription {
    pub fn new(
        collection: Collection,
        rx: mpsc::UnboundedReceiver<ChangeEvent>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            collection,
            rx,
            release: Some(Box::new(release)),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Next event, or `None` once the feed side has gone away.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            self.rx.close();
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("released", &self.release.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_conversation_ref_reads_new_row() {
        let event = ChangeEvent::new(
            Collection::Messages,
            ChangeKind::Insert,
            Some(json!({"id": "m1", "conversation_id": "c1"})),
        );
        assert_eq!(event.conversation_ref(), Some("c1"));
    }

    #[test]
    fn test_conversation_ref_ignores_old_row() {
        let event = ChangeEvent::new(Collection::Messages, ChangeKind::Delete, None)
            .with_old(json!({"id": "m1", "conversation_id": "c1"}));
        assert_eq!(event.conversation_ref(), None);
    }

    #[test]
    fn test_parse_wire_event() {
        let json = r#"{"collection": "messages", "kind": "UPDATE", "new": {"conversation_id": "c9"}}"#;
        let event: ChangeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, ChangeKind::Update);
        assert_eq!(event.conversation_ref(), Some("c9"));
        assert!(event.old.is_none());
    }

    #[test]
    fn test_release_runs_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::unbounded_channel();
        let counter = released.clone();
        let subscription = Subscription::new(Collection::Conversations, rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // unsubscribe consumes the handle, so Drop runs right after
        subscription.unsubscribe();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_delivery_after_unsubscribe() {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = Subscription::new(Collection::Conversations, rx, || {});
        subscription.unsubscribe();

        let event = ChangeEvent::new(Collection::Conversations, ChangeKind::Insert, None);
        assert!(tx.send(event).is_err());
    }
}
