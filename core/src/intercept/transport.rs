use super::{BoxError, HttpBody, HttpTransport, TransportResult};
use futures::future::BoxFuture;
use futures::TryStreamExt;
use http::{Request, Response};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;

/// Default network transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: Request<HttpBody>) -> BoxFuture<'_, TransportResult> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = body.collect().await?.to_bytes();

            let mut builder = self
                .client
                .request(parts.method, parts.uri.to_string())
                .headers(parts.headers);
            if !body.is_empty() {
                builder = builder.body(body);
            }

            let upstream = builder.send().await?;
            let mut response = Response::builder()
                .status(upstream.status())
                .version(upstream.version());
            if let Some(headers) = response.headers_mut() {
                headers.extend(
                    upstream
                        .headers()
                        .iter()
                        .map(|(name, value)| (name.clone(), value.clone())),
                );
            }

            let frames = upstream
                .bytes_stream()
                .map_ok(Frame::data)
                .map_err(|err| Box::new(err) as BoxError);
            Ok(response.body(StreamBody::new(frames).boxed_unsync())?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intercept::empty_body;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    #[ignore = "Requires opening local TCP ports"]
    async fn streams_response_from_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 11\r\n\r\n{\"ok\":true}",
                )
                .await
                .unwrap();
        });

        let transport = ReqwestTransport::new().unwrap();
        let request = Request::get(format!("http://{addr}/a"))
            .body(empty_body())
            .unwrap();
        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"{\"ok\":true}");

        server.await.unwrap();
    }
}
