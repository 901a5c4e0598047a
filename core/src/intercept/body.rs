use super::{full_body, BoxError, HttpBody};
use crate::events::{EventBus, TrafficEvent};
use crate::models::{headers_to_map, RequestId, RequestOutcome, ResponseRecord};
use bytes::{Bytes, BytesMut};
use futures::stream;
use http::Response;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Body, Frame, SizeHint};
use std::collections::HashMap;
use std::mem;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio::time::Instant;

const CANCELLED: &str = "cancelled";

/// Bounded copy of body bytes kept for the record.
pub(crate) struct BodyCapture {
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl BodyCapture {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            truncated: false,
        }
    }

    pub(crate) fn push(&mut self, data: &[u8]) {
        let remaining = self.limit.saturating_sub(self.buf.len());
        let to_take = remaining.min(data.len());
        if to_take < data.len() {
            self.truncated = true;
        }
        if to_take > 0 {
            self.buf.extend_from_slice(&data[..to_take]);
        }
    }

    pub(crate) fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub(crate) fn into_option(self) -> Option<Vec<u8>> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf)
        }
    }
}

/// Result of draining an outbound request body.
pub(crate) struct CapturedRequestBody {
    /// Bytes kept for the record
    pub recorded: Option<Vec<u8>>,
    /// Whether `recorded` stops short of what was sent
    pub truncated: bool,
    /// Body to hand to the real transport in place of the drained one
    pub replay: HttpBody,
}

/// Drain `body` into memory and rebuild an equivalent body for sending.
///
/// A source that errors partway keeps what was read; the rebuilt body yields
/// that prefix and then the same error, so the transport fails the way it
/// would have without interception.
pub(crate) async fn capture_request_body(
    mut body: HttpBody,
    limit: usize,
) -> CapturedRequestBody {
    if body.is_end_stream() {
        return CapturedRequestBody {
            recorded: None,
            truncated: false,
            replay: body,
        };
    }

    let mut drained = BytesMut::new();
    let mut trailers = None;
    let mut failure: Option<BoxError> = None;
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => match frame.into_data() {
                Ok(data) => drained.extend_from_slice(&data),
                Err(frame) => {
                    if let Ok(map) = frame.into_trailers() {
                        trailers = Some(map);
                    }
                }
            },
            Err(err) => {
                tracing::warn!(
                    "Request body capture stopped after {} bytes: {}",
                    drained.len(),
                    err
                );
                failure = Some(err);
                break;
            }
        }
    }

    let drained = drained.freeze();
    let mut capture = BodyCapture::new(limit);
    capture.push(&drained);
    let truncated = capture.is_truncated();
    let recorded = capture.into_option();

    let replay = if trailers.is_none() && failure.is_none() {
        full_body(drained)
    } else {
        let mut frames: Vec<Result<Frame<Bytes>, BoxError>> = Vec::with_capacity(3);
        if !drained.is_empty() {
            frames.push(Ok(Frame::data(drained)));
        }
        if let Some(map) = trailers {
            frames.push(Ok(Frame::trailers(map)));
        }
        if let Some(err) = failure {
            frames.push(Err(err));
        }
        StreamBody::new(stream::iter(frames)).boxed_unsync()
    };

    CapturedRequestBody {
        recorded,
        truncated,
        replay,
    }
}

/// Emits the single terminal update for one claimed request.
///
/// Dropping a tracker that never settled reports the request as failed, which
/// covers callers abandoning the exchange mid-flight.
pub(crate) struct ExchangeTracker {
    id: RequestId,
    started: Instant,
    bus: EventBus,
    capture_limit: usize,
    settled: bool,
}

impl ExchangeTracker {
    pub(crate) fn new(
        id: RequestId,
        started: Instant,
        bus: EventBus,
        capture_limit: usize,
    ) -> Self {
        Self {
            id,
            started,
            bus,
            capture_limit,
            settled: false,
        }
    }

    fn settle(&mut self, outcome: RequestOutcome) {
        if self.settled {
            return;
        }
        self.settled = true;
        self.bus.publish(TrafficEvent::updated(self.id, outcome));
    }

    pub(crate) fn fail(mut self, error: impl Into<String>) {
        let error = error.into();
        tracing::debug!(
            "Request {} failed after {:?}: {}",
            self.id,
            self.started.elapsed(),
            error
        );
        self.settle(RequestOutcome::failed(error));
    }

    fn complete(mut self, head: ResponseHead, capture: BodyCapture) {
        let body_truncated = capture.is_truncated();
        let response = ResponseRecord {
            status_code: head.status_code,
            headers: head.headers,
            body: capture.into_option(),
            response_time: self.started.elapsed(),
            body_truncated,
        };
        tracing::debug!(
            "Request {} completed with {} in {}ms",
            self.id,
            response.status_code,
            response.response_time_ms()
        );
        self.settle(RequestOutcome::Completed(response));
    }

    /// Wrap a response so its body is recorded as the caller reads it.
    pub(crate) fn observe(self, response: Response<HttpBody>) -> Response<HttpBody> {
        let (parts, body) = response.into_parts();
        let head = ResponseHead {
            status_code: parts.status.as_u16(),
            headers: headers_to_map(&parts.headers),
        };
        tracing::trace!("Request {} received head {}", self.id, head.status_code);

        let mut recording = RecordingBody {
            inner: body,
            capture: BodyCapture::new(self.capture_limit),
            head: Some(head),
            tracker: Some(self),
        };
        if recording.inner.is_end_stream() {
            recording.finish_completed();
        }
        Response::from_parts(parts, recording.boxed_unsync())
    }
}

impl Drop for ExchangeTracker {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!("Request {} abandoned: {}", self.id, CANCELLED);
            self.settle(RequestOutcome::failed(CANCELLED));
        }
    }
}

struct ResponseHead {
    status_code: u16,
    headers: HashMap<String, String>,
}

/// Pass-through response body that keeps a copy of every data frame.
struct RecordingBody {
    inner: HttpBody,
    capture: BodyCapture,
    head: Option<ResponseHead>,
    tracker: Option<ExchangeTracker>,
}

impl RecordingBody {
    fn finish_completed(&mut self) {
        if let (Some(tracker), Some(head)) = (self.tracker.take(), self.head.take()) {
            let capture = mem::replace(&mut self.capture, BodyCapture::new(0));
            tracker.complete(head, capture);
        }
    }

    fn finish_failed(&mut self, error: String) {
        if let Some(tracker) = self.tracker.take() {
            tracker.fail(error);
        }
    }
}

impl Body for RecordingBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.capture.push(data);
                }
                if this.inner.is_end_stream() {
                    this.finish_completed();
                }
            }
            Poll::Ready(Some(Err(err))) => this.finish_failed(err.to_string()),
            Poll::Ready(None) => this.finish_completed(),
            Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for RecordingBody {
    fn drop(&mut self) {
        // The caller may stop polling once the inner body reports its end.
        if self.tracker.is_some() && self.inner.is_end_stream() {
            self.finish_completed();
        }
    }
}
