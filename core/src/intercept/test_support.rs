//! Scripted transport used by the interception tests.

use super::{BoxError, HttpBody, HttpTransport, RecordingMarker, TransportResult};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub(crate) struct ScriptedError(pub &'static str);

pub(crate) fn chunked_body(chunks: &[&'static [u8]]) -> HttpBody {
    let frames: Vec<Result<Frame<Bytes>, BoxError>> = chunks
        .iter()
        .map(|chunk| Ok(Frame::data(Bytes::from_static(chunk))))
        .collect();
    StreamBody::new(stream::iter(frames)).boxed_unsync()
}

pub(crate) fn failing_body(chunks: &[&'static [u8]], error: &'static str) -> HttpBody {
    let mut frames: Vec<Result<Frame<Bytes>, BoxError>> = chunks
        .iter()
        .map(|chunk| Ok(Frame::data(Bytes::from_static(chunk))))
        .collect();
    frames.push(Err(Box::new(ScriptedError(error))));
    StreamBody::new(stream::iter(frames)).boxed_unsync()
}

/// What the scripted transport should answer with.
#[derive(Clone, Copy)]
pub(crate) enum Reply {
    Chunks {
        status: StatusCode,
        content_type: &'static str,
        chunks: &'static [&'static [u8]],
    },
    FailAfter {
        chunks: &'static [&'static [u8]],
        error: &'static str,
    },
    Error(&'static str),
}

/// A request as it reached the transport.
#[derive(Debug, Clone)]
pub(crate) struct Delivered {
    pub method: String,
    pub uri: String,
    pub body: Vec<u8>,
    pub tagged: bool,
}

pub(crate) struct ScriptedTransport {
    reply: Reply,
    delivered: Mutex<Vec<Delivered>>,
}

impl ScriptedTransport {
    pub(crate) fn new(reply: Reply) -> Self {
        Self {
            reply,
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn ok_json(chunks: &'static [&'static [u8]]) -> Self {
        Self::new(Reply::Chunks {
            status: StatusCode::OK,
            content_type: "application/json",
            chunks,
        })
    }

    pub(crate) fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: Request<HttpBody>) -> BoxFuture<'_, TransportResult> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = body.collect().await?.to_bytes().to_vec();
            self.delivered.lock().unwrap().push(Delivered {
                method: parts.method.to_string(),
                uri: parts.uri.to_string(),
                body,
                tagged: parts.extensions.get::<RecordingMarker>().is_some(),
            });

            match &self.reply {
                Reply::Chunks {
                    status,
                    content_type,
                    chunks,
                } => {
                    let mut response = Response::new(chunked_body(chunks));
                    *response.status_mut() = *status;
                    response
                        .headers_mut()
                        .insert(http::header::CONTENT_TYPE, content_type.parse().unwrap());
                    Ok(response)
                }
                Reply::FailAfter { chunks, error } => {
                    Ok(Response::new(failing_body(chunks, *error)))
                }
                Reply::Error(message) => Err(Box::new(ScriptedError(*message)) as BoxError),
            }
        })
    }
}
