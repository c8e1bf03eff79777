//! Named event sources and scoped subscriptions.
//!
//! Both the host's "message sent" event and the bridge's inbound Discord
//! events are published through an [`EventSource`]. A [`Subscription`] stays
//! attached until it is dropped.

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default buffer for each subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// A named multi-subscriber event source.
#[derive(Debug, Clone)]
pub struct EventSource<T> {
    name: &'static str,
    tx: broadcast::Sender<T>,
}

impl<T: Clone> EventSource<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { name, tx }
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn emit(&self, event: T) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => {
                debug!("No subscribers for '{}', event dropped", self.name);
                0
            }
        }
    }

    /// Attach a new subscriber.
    pub fn subscribe(&self) -> Subscription<T> {
        debug!("Subscribed to '{}'", self.name);
        Subscription {
            name: self.name,
            rx: self.tx.subscribe(),
        }
    }

    #[allow(dead_code)]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// An attached subscriber. Detaches on drop.
#[derive(Debug)]
pub struct Subscription<T> {
    name: &'static str,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> Subscription<T> {
    /// Wait for the next event. Returns `None` once the source is gone.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber of '{}' lagged, {} events skipped", self.name, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        debug!("Unsubscribed from '{}'", self.name);
    }
}
