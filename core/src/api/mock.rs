use super::debugger::{NetworkIntercepting, NetworkRequestsStore};
use crate::events::{EventBus, TrafficEvent};
use crate::models::{RequestOutcome, RequestRecord, ResponseRecord};
use crate::storage::RequestRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const MOCK_URL: &str = "https://mock-url.com";
pub const MOCK_PERIOD: Duration = Duration::from_secs(2);

/// Synthetic traffic source for previews and UI work without a network.
///
/// While started it appends one completed `GET` every period.
pub struct MockNetworkInterceptor {
    registry: Arc<RequestRegistry>,
    bus: EventBus,
    period: Duration,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl MockNetworkInterceptor {
    pub fn new(period: Duration) -> Self {
        Self {
            registry: Arc::new(RequestRegistry::new()),
            bus: EventBus::new(),
            period,
            ticker: Mutex::new(None),
        }
    }

    /// Lifecycle events for the synthetic requests.
    pub fn subscribe(&self) -> tokio::sync::mpsc::UnboundedReceiver<TrafficEvent> {
        self.bus.subscribe()
    }

    /// One fake exchange, recorded and published.
    pub fn emit(&self) {
        emit_mock(&self.registry, &self.bus);
    }
}

impl Default for MockNetworkInterceptor {
    fn default() -> Self {
        Self::new(MOCK_PERIOD)
    }
}

fn json_headers() -> HashMap<String, String> {
    HashMap::from([("Content-Type".to_string(), "application/json".to_string())])
}

fn emit_mock(registry: &RequestRegistry, bus: &EventBus) {
    let record = RequestRecord::new(MOCK_URL, "GET", json_headers(), None);
    let id = record.id;
    let outcome = RequestOutcome::Completed(ResponseRecord {
        status_code: 200,
        headers: json_headers(),
        body: Some(br#"{"success":true}"#.to_vec()),
        response_time: Duration::from_secs(2),
        body_truncated: false,
    });

    registry.record_started(record.clone());
    bus.publish(TrafficEvent::Started(record));
    registry.record_updated(id, outcome.clone());
    bus.publish(TrafficEvent::updated(id, outcome));
}

impl NetworkIntercepting for MockNetworkInterceptor {
    fn start_intercepting(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.is_some() {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Mock interceptor needs a Tokio runtime, not starting");
            return;
        };

        let registry = Arc::clone(&self.registry);
        let bus = self.bus.clone();
        let period = self.period;
        *ticker = Some(runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                emit_mock(&registry, &bus);
            }
        }));
        tracing::debug!("Mock traffic started every {:?}", period);
    }

    fn stop_intercepting(&self) {
        if let Some(task) = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
            tracing::debug!("Mock traffic stopped");
        }
    }
}

impl NetworkRequestsStore for MockNetworkInterceptor {
    fn get_all_requests(&self) -> Vec<RequestRecord> {
        self.registry.snapshot()
    }

    fn clear_requests(&self) {
        self.registry.clear();
        self.bus.publish(TrafficEvent::Cleared);
    }
}

impl Drop for MockNetworkInterceptor {
    fn drop(&mut self) {
        self.stop_intercepting();
    }
}
