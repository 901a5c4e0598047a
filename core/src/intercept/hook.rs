use super::body::{capture_request_body, ExchangeTracker};
use super::{HttpBody, HttpTransport, TransportResult, UrlInterceptor};
use crate::events::{EventBus, TrafficEvent};
use crate::models::{headers_to_map, RequestRecord};
use futures::future::BoxFuture;
use http::Request;
use tokio::time::Instant;

/// Request extension marking a request the recorder already re-issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingMarker;

/// Whether the recorder takes ownership of `request`.
pub fn is_claimable<B>(request: &Request<B>) -> bool {
    if request.extensions().get::<RecordingMarker>().is_some() {
        return false;
    }
    matches!(request.uri().scheme_str(), Some("http") | Some("https"))
}

/// Records every `http`/`https` exchange routed through it and publishes
/// the lifecycle on an [`EventBus`].
pub struct RecordingInterceptor {
    bus: EventBus,
    capture_limit: usize,
}

impl RecordingInterceptor {
    pub fn new(bus: EventBus, capture_limit: usize) -> Self {
        Self { bus, capture_limit }
    }
}

impl UrlInterceptor for RecordingInterceptor {
    fn can_handle(&self, request: &Request<HttpBody>) -> bool {
        is_claimable(request)
    }

    fn start_loading<'a>(
        &'a self,
        request: Request<HttpBody>,
        upstream: &'a dyn HttpTransport,
    ) -> BoxFuture<'a, TransportResult> {
        Box::pin(async move {
            let started = Instant::now();
            let (mut parts, body) = request.into_parts();
            let captured = capture_request_body(body, self.capture_limit).await;

            let mut record = RequestRecord::new(
                parts.uri.to_string(),
                parts.method.as_str(),
                headers_to_map(&parts.headers),
                captured.recorded,
            );
            record.body_truncated = captured.truncated;
            let id = record.id;
            tracing::debug!("Recording {} {} as {}", record.method, record.url, id);

            let tracker = ExchangeTracker::new(id, started, self.bus.clone(), self.capture_limit);
            self.bus.publish(TrafficEvent::Started(record));

            parts.extensions.insert(RecordingMarker);
            let request = Request::from_parts(parts, captured.replay);
            match upstream.send(request).await {
                Ok(response) => Ok(tracker.observe(response)),
                Err(err) => {
                    tracker.fail(err.to_string());
                    Err(err)
                }
            }
        })
    }
}
