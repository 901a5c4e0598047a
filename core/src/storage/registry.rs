use crate::events::TrafficEvent;
use crate::models::{RequestId, RequestOutcome, RequestRecord};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Default)]
struct RegistryState {
    /// Insertion order, oldest first
    records: Vec<RequestRecord>,
    /// Position of each id in `records`
    index: HashMap<RequestId, usize>,
}

/// Authoritative in-memory store of every request seen this process.
#[derive(Default)]
pub struct RequestRegistry {
    state: RwLock<RegistryState>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Request registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Request registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Append a pending record.
    pub fn record_started(&self, record: RequestRecord) {
        let mut state = self.write();
        if state.index.contains_key(&record.id) {
            tracing::warn!("Ignoring duplicate start for request {}", record.id);
            return;
        }
        let position = state.records.len();
        state.index.insert(record.id, position);
        state.records.push(record);
    }

    /// Apply a terminal outcome. Returns `false` when the update was dropped.
    pub fn record_updated(&self, id: RequestId, outcome: RequestOutcome) -> bool {
        let mut state = self.write();
        let Some(position) = state.index.get(&id).copied() else {
            tracing::debug!("Dropping update for unknown request {}", id);
            return false;
        };
        match state.records[position].apply_outcome(outcome) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("Dropping update: {}", err);
                false
            }
        }
    }

    /// Independent copy of all records, newest first.
    pub fn snapshot(&self) -> Vec<RequestRecord> {
        self.read().records.iter().rev().cloned().collect()
    }

    pub fn get(&self, id: RequestId) -> Option<RequestRecord> {
        let state = self.read();
        state
            .index
            .get(&id)
            .map(|&position| state.records[position].clone())
    }

    /// Remove every record. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        self.clear_then(|| {})
    }

    /// Remove every record and run `announce` before any event can be
    /// applied again. Events published from `announce` onwards land on an
    /// empty registry.
    pub fn clear_then(&self, announce: impl FnOnce()) -> usize {
        let mut state = self.write();
        let removed = state.records.len();
        state.records.clear();
        state.index.clear();
        announce();
        removed
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold a bus event into the store. `Cleared` drops whatever was still
    /// queued ahead of it when the clear happened.
    pub fn apply(&self, event: TrafficEvent) {
        match event {
            TrafficEvent::Started(record) => self.record_started(record),
            TrafficEvent::Updated(update) => {
                self.record_updated(update.id, update.outcome);
            }
            TrafficEvent::Cleared => {
                self.clear();
            }
        }
    }

    /// Drain a subscription into this registry on a background task.
    pub fn attach(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<TrafficEvent>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                registry.apply(event);
            }
            tracing::debug!("Traffic subscription closed, registry consumer exiting");
        })
    }
}
