use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{ChangeEvent, ChangeFeed, Collection, NotifyError, Subscription};

type SubscriberId = u64;

#[derive(Default)]
struct HubInner {
    next_id: AtomicU64,
    closed: AtomicBool,
    subscribers: Mutex<HashMap<SubscriberId, (Collection, mpsc::UnboundedSender<ChangeEvent>)>>,
}

/// In-process fan-out of change events to per-collection subscribers.
///
/// Whatever observes the store (the in-memory store, a realtime transport)
/// publishes here; consumers subscribe through [`ChangeFeed`].
#[derive(Clone, Default)]
pub struct ChangeHub {
    inner: Arc<HubInner>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every subscriber of its collection.
    /// Returns how many subscribers received it.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        let mut subscribers = self.inner.subscribers.lock();
        let mut delivered = 0;
        subscribers.retain(|id, (collection, tx)| {
            if *collection != event.collection {
                return true;
            }
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                tracing::debug!("Dropping closed subscriber {} on {:?}", id, collection);
                false
            }
        });
        delivered
    }

    pub fn subscriber_count(&self, collection: Collection) -> usize {
        self.inner
            .subscribers
            .lock()
            .values()
            .filter(|(c, _)| *c == collection)
            .count()
    }

    /// Refuse new subscriptions and drop existing ones; their streams end.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.subscribers.lock().clear();
    }

    fn release(inner: &Weak<HubInner>, id: SubscriberId) {
        if let Some(inner) = inner.upgrade() {
            inner.subscribers.lock().remove(&id);
        }
    }
}

impl ChangeFeed for ChangeHub {
    fn subscribe(&self, collection: Collection) -> Result<Subscription, NotifyError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(NotifyError::Closed);
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.subscribers.lock().insert(id, (collection, tx));
        tracing::debug!("Subscriber {} attached to {:?}", id, collection);

        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(collection, rx, move || {
            ChangeHub::release(&weak, id)
        }))
    }
}
