//! Traffic event fan-out
//!
//! The recording interceptor publishes from whatever task or thread the
//! transport drives it on; every subscriber gets its own unbounded queue so a
//! slow consumer never stalls the network path.

use crate::models::{RequestId, RequestOutcome, RequestRecord, RequestStatus, ResponseRecord};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Terminal update for a previously started request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestUpdate {
    pub id: RequestId,
    pub outcome: RequestOutcome,
}

impl RequestUpdate {
    pub fn status(&self) -> RequestStatus {
        self.outcome.status()
    }

    pub fn response(&self) -> Option<&ResponseRecord> {
        self.outcome.response()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrafficEvent {
    /// A request was claimed; the record is still pending
    Started(RequestRecord),
    /// A pending request reached its terminal state
    Updated(RequestUpdate),
    /// The presentation layer cleared the registry
    Cleared,
}

impl TrafficEvent {
    pub fn updated(id: RequestId, outcome: RequestOutcome) -> Self {
        TrafficEvent::Updated(RequestUpdate { id, outcome })
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            TrafficEvent::Started(record) => Some(record.id),
            TrafficEvent::Updated(update) => Some(update.id),
            TrafficEvent::Cleared => None,
        }
    }
}

type Subscribers = Vec<mpsc::UnboundedSender<TrafficEvent>>;

/// Multi-subscriber channel for [`TrafficEvent`]s.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Subscribers>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. It receives every event published afterwards.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TrafficEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver an event to every live subscriber without blocking.
    pub fn publish(&self, event: TrafficEvent) {
        let mut saw_closed = false;
        {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if subscribers.is_empty() {
                tracing::trace!("No traffic subscribers, dropping {:?}", event.request_id());
                return;
            }
            for subscriber in subscribers.iter() {
                if subscriber.send(event.clone()).is_err() {
                    saw_closed = true;
                }
            }
        }

        if saw_closed {
            let mut subscribers = self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|s| !s.is_closed());
            tracing::debug!(
                "Pruned closed traffic subscribers, {} remaining",
                subscribers.len()
            );
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .map(|s| s.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
