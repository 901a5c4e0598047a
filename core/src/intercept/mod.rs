//! Request interception
//!
//! The host app sends its HTTP traffic through a [`RequestRouter`]. While the
//! [`RecordingInterceptor`] is registered on that router it claims every
//! `http`/`https` request, records it, and re-issues a tagged copy through the
//! router so the real transport performs the exchange.

mod body;
mod hook;
mod router;
mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use hook::{is_claimable, RecordingInterceptor, RecordingMarker};
pub use router::{RequestRouter, UrlInterceptor};
pub use transport::ReqwestTransport;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body type flowing through the router in both directions.
pub type HttpBody = UnsyncBoxBody<Bytes, BoxError>;

pub type TransportResult = Result<Response<HttpBody>, BoxError>;

/// Something that can perform an HTTP exchange.
///
/// The returned response carries a streaming body; each data frame is one
/// chunk delivered by the network, the end of the stream is completion and a
/// body error is a failure after the head was received.
pub trait HttpTransport: Send + Sync {
    fn send(&self, request: Request<HttpBody>) -> BoxFuture<'_, TransportResult>;
}

pub fn full_body(bytes: impl Into<Bytes>) -> HttpBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> HttpBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}
