//! Floating activity badge
//!
//! Counts requests started since the last clear and tells the overlay when to
//! pulse and what to show.

use crate::events::TrafficEvent;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_BADGE_CAP: usize = 99;

/// Receives badge changes. Called on the consumer task, never on the network
/// path.
pub trait BadgeListener: Send + Sync {
    /// A new request was claimed; the overlay may animate.
    fn request_started(&self) {}

    /// The counter changed. `label` is `None` when the badge should hide.
    fn count_changed(&self, count: usize, label: Option<&str>);
}

/// Text shown on the badge, or `None` when it should be hidden.
pub fn badge_label(count: usize, cap: usize) -> Option<String> {
    match count {
        0 => None,
        n if n > cap => Some(format!("{cap}+")),
        n => Some(n.to_string()),
    }
}

pub struct ActivityBadge {
    count: AtomicUsize,
    cap: usize,
    listener: RwLock<Option<Arc<dyn BadgeListener>>>,
}

impl ActivityBadge {
    pub fn new(cap: usize) -> Self {
        Self {
            count: AtomicUsize::new(0),
            cap,
            listener: RwLock::new(None),
        }
    }

    pub fn set_listener(&self, listener: Arc<dyn BadgeListener>) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn label(&self) -> Option<String> {
        badge_label(self.count(), self.cap)
    }

    pub fn handle(&self, event: &TrafficEvent) {
        let count = match event {
            TrafficEvent::Started(_) => self.count.fetch_add(1, Ordering::AcqRel) + 1,
            TrafficEvent::Cleared => {
                self.count.store(0, Ordering::Release);
                0
            }
            TrafficEvent::Updated(_) => return,
        };

        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(listener) = listener else {
            return;
        };
        if matches!(event, TrafficEvent::Started(_)) {
            listener.request_started();
        }
        let label = badge_label(count, self.cap);
        listener.count_changed(count, label.as_deref());
    }

    /// Consume a subscription on a background task.
    pub fn attach(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<TrafficEvent>,
    ) -> JoinHandle<()> {
        let badge = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                badge.handle(&event);
            }
            tracing::debug!("Traffic subscription closed, badge consumer exiting");
        })
    }
}

impl Default for ActivityBadge {
    fn default() -> Self {
        Self::new(DEFAULT_BADGE_CAP)
    }
}
