//! Broadcast of settled facts to observers.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::core::{Event, EventEnvelope};

/// Default number of facts buffered per subscriber before it lags.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Fan-out of every fact the engine settles.
///
/// Delivery to observers is at-most-once: a subscriber that falls more than
/// `capacity` facts behind gets `RecvError::Lagged` and misses the overflow.
/// Publishing never blocks and never fails for lack of subscribers.
#[derive(Debug)]
pub struct EventBus<E: Event> {
    sender: broadcast::Sender<Arc<EventEnvelope<E>>>,
}

impl<E: Event> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a settled fact. Returns how many subscribers will see it.
    pub fn publish(&self, envelope: EventEnvelope<E>) -> usize {
        self.sender.send(Arc::new(envelope)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EventEnvelope<E>>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
