//! Debugger facade
//!
//! Wires the recording hook, the registry and the badge together on one
//! event bus and exposes the two capability traits the overlay talks to.

use super::config::DebuggerConfig;
use crate::badge::ActivityBadge;
use crate::error::DebuggerError;
use crate::events::{EventBus, TrafficEvent};
use crate::export::{preview_body, BodyPreview};
use crate::intercept::{RecordingInterceptor, RequestRouter, UrlInterceptor};
use crate::models::RequestRecord;
use crate::storage::RequestRegistry;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Turns traffic recording on and off.
pub trait NetworkIntercepting: Send + Sync {
    fn start_intercepting(&self);
    fn stop_intercepting(&self);
}

/// Read access to recorded traffic for list and detail screens.
pub trait NetworkRequestsStore: Send + Sync {
    /// Every recorded request, newest first.
    fn get_all_requests(&self) -> Vec<RequestRecord>;
    fn clear_requests(&self);
}

pub struct NetworkDebugger {
    config: DebuggerConfig,
    router: Arc<RequestRouter>,
    bus: EventBus,
    registry: Arc<RequestRegistry>,
    badge: Arc<ActivityBadge>,
    hook: Arc<dyn UrlInterceptor>,
    intercepting: AtomicBool,
    consumers: Vec<JoinHandle<()>>,
}

impl NetworkDebugger {
    /// Build the debugger around `router`. Must be called inside a Tokio
    /// runtime; the registry and badge consume events on spawned tasks.
    pub fn new(config: DebuggerConfig, router: Arc<RequestRouter>) -> Result<Self, DebuggerError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(DebuggerError::NoRuntime);
        }
        config.validate()?;

        let bus = EventBus::new();
        let registry = Arc::new(RequestRegistry::new());
        let badge = Arc::new(ActivityBadge::new(config.badge_cap));
        let consumers = vec![
            registry.attach(bus.subscribe()),
            badge.attach(bus.subscribe()),
        ];
        let hook: Arc<dyn UrlInterceptor> = Arc::new(RecordingInterceptor::new(
            bus.clone(),
            config.max_body_capture_bytes,
        ));

        tracing::info!(
            "Network debugger ready (capture limit {} bytes)",
            config.max_body_capture_bytes
        );
        Ok(Self {
            config,
            router,
            bus,
            registry,
            badge,
            hook,
            intercepting: AtomicBool::new(false),
            consumers,
        })
    }

    /// Debugger on a fresh router backed by the default HTTP client.
    pub fn with_default_router(config: DebuggerConfig) -> Result<Self, DebuggerError> {
        let router = Arc::new(RequestRouter::with_default_transport()?);
        Self::new(config, router)
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// The router the host app must send its traffic through.
    pub fn router(&self) -> Arc<RequestRouter> {
        Arc::clone(&self.router)
    }

    pub fn badge(&self) -> Arc<ActivityBadge> {
        Arc::clone(&self.badge)
    }

    pub fn registry(&self) -> Arc<RequestRegistry> {
        Arc::clone(&self.registry)
    }

    /// Additional subscription to the raw lifecycle events.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<TrafficEvent> {
        self.bus.subscribe()
    }

    pub fn is_intercepting(&self) -> bool {
        self.intercepting.load(Ordering::Acquire)
    }

    /// Render a recorded body for the detail view, honouring the configured
    /// preview limit.
    pub fn preview(&self, body: Option<&[u8]>, headers: &HashMap<String, String>) -> BodyPreview {
        preview_body(body, headers, self.config.preview_limit_bytes)
    }
}

impl fmt::Debug for NetworkDebugger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkDebugger")
            .field("config", &self.config)
            .field("intercepting", &self.is_intercepting())
            .field("records", &self.registry.len())
            .field("bus", &self.bus)
            .finish()
    }
}

impl NetworkIntercepting for NetworkDebugger {
    fn start_intercepting(&self) {
        if self.intercepting.swap(true, Ordering::AcqRel) {
            tracing::debug!("Interception already active");
            return;
        }
        self.router.register_interceptor(Arc::clone(&self.hook));
        tracing::info!("Network interception started");
    }

    fn stop_intercepting(&self) {
        if !self.intercepting.swap(false, Ordering::AcqRel) {
            tracing::debug!("Interception already stopped");
            return;
        }
        self.router.unregister_interceptor(&self.hook);
        tracing::info!("Network interception stopped");
    }
}

impl NetworkRequestsStore for NetworkDebugger {
    fn get_all_requests(&self) -> Vec<RequestRecord> {
        self.registry.snapshot()
    }

    fn clear_requests(&self) {
        // Publishing under the registry lock keeps later `Started` events behind `Cleared`.
        let removed = self
            .registry
            .clear_then(|| self.bus.publish(TrafficEvent::Cleared));
        tracing::info!("Cleared {} recorded requests", removed);
    }
}

impl Drop for NetworkDebugger {
    fn drop(&mut self) {
        if self.is_intercepting() {
            self.router.unregister_interceptor(&self.hook);
        }
        for consumer in &self.consumers {
            consumer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::test_support::ScriptedTransport;
    use crate::intercept::{empty_body, HttpTransport};
    use crate::models::RequestStatus;
    use http::Request;
    use http_body_util::BodyExt;
    use std::time::Duration;

    async fn eventually(mut check: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition reached in time");
    }

    fn debugger() -> (NetworkDebugger, Arc<ScriptedTransport>) {
        let base = Arc::new(ScriptedTransport::ok_json(&[b"{\"ok\":true}"]));
        let router = Arc::new(RequestRouter::new(base.clone()));
        let debugger = NetworkDebugger::new(DebuggerConfig::default(), router).unwrap();
        (debugger, base)
    }

    async fn fetch(router: &RequestRouter, uri: &str) {
        let request = Request::get(uri).body(empty_body()).unwrap();
        let response = router.send(request).await.unwrap();
        response.into_body().collect().await.unwrap();
    }

    #[test]
    fn requires_runtime() {
        let router = Arc::new(RequestRouter::new(Arc::new(ScriptedTransport::ok_json(&[]))));
        let err = NetworkDebugger::new(DebuggerConfig::default(), router).unwrap_err();
        assert!(matches!(err, DebuggerError::NoRuntime));
    }

    #[tokio::test]
    async fn debug_output_summarises_state() {
        let (debugger, _base) = debugger();
        debugger.start_intercepting();
        let rendered = format!("{debugger:?}");
        assert!(rendered.starts_with("NetworkDebugger {"));
        assert!(rendered.contains("intercepting: true"));
        assert!(rendered.contains("records: 0"));
    }

    #[tokio::test]
    async fn preview_uses_configured_limit() {
        let base = Arc::new(ScriptedTransport::ok_json(&[]));
        let router = Arc::new(RequestRouter::new(base));
        let config = DebuggerConfig {
            preview_limit_bytes: 4,
            ..DebuggerConfig::default()
        };
        let debugger = NetworkDebugger::new(config, router).unwrap();
        let headers = HashMap::new();

        assert_eq!(
            debugger.preview(Some(&b"tiny"[..]), &headers).display_text(),
            "tiny"
        );
        assert!(matches!(
            debugger.preview(Some(&b"too long"[..]), &headers),
            BodyPreview::TooLarge { size: 8, .. }
        ));
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let (debugger, _base) = debugger();
        let router = debugger.router();

        debugger.start_intercepting();
        debugger.start_intercepting();
        assert!(debugger.is_intercepting());
        assert_eq!(router.interceptor_count(), 1);

        debugger.stop_intercepting();
        debugger.stop_intercepting();
        assert!(!debugger.is_intercepting());
        assert_eq!(router.interceptor_count(), 0);
    }

    #[tokio::test]
    async fn records_only_while_intercepting() {
        let (debugger, base) = debugger();
        let router = debugger.router();

        fetch(&router, "https://example.com/before").await;
        debugger.start_intercepting();
        fetch(&router, "https://example.com/during").await;
        debugger.stop_intercepting();
        fetch(&router, "https://example.com/after").await;

        eventually(|| {
            debugger
                .get_all_requests()
                .first()
                .is_some_and(|r| r.status == RequestStatus::Completed)
        })
        .await;
        let records = debugger.get_all_requests();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://example.com/during");
        assert_eq!(base.delivered().len(), 3);
    }

    #[tokio::test]
    async fn clear_empties_registry_and_badge() {
        let (debugger, _base) = debugger();
        let router = debugger.router();
        debugger.start_intercepting();
        for i in 0..3 {
            fetch(&router, &format!("https://example.com/{i}")).await;
        }
        eventually(|| {
            let records = debugger.get_all_requests();
            records.len() == 3 && records.iter().all(|r| r.status == RequestStatus::Completed)
        })
        .await;
        eventually(|| debugger.badge().count() == 3).await;
        assert_eq!(debugger.badge().label().as_deref(), Some("3"));

        debugger.clear_requests();
        assert!(debugger.get_all_requests().is_empty());
        eventually(|| debugger.badge().count() == 0).await;
        assert!(debugger.get_all_requests().is_empty());
        assert_eq!(debugger.badge().label(), None);
    }

    #[tokio::test]
    async fn dropping_debugger_detaches_hook() {
        let (debugger, _base) = debugger();
        let router = debugger.router();
        debugger.start_intercepting();
        assert_eq!(router.interceptor_count(), 1);
        drop(debugger);
        assert_eq!(router.interceptor_count(), 0);
    }
}
