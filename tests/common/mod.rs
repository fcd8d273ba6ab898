//! Shared utilities for integration testing.
//!
//! A mock identity provider speaking HTTP/2 with prior knowledge on a local
//! port, and a dialer that sends every hop there regardless of the URL host.

#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use h2::server::SendResponse;
use h2::Reason;
use hyper::body::Incoming;
use hyper::server::conn::http2;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::{TcpListener, TcpStream};

use login_relay::hop::H2HopClient;
use login_relay::net::{Dial, HopTarget};
use login_relay::resilience::HopDeadlines;

/// What the mock provider saw for one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path_and_query: String,
    pub cookie: Option<String>,
}

/// Requests recorded by a mock provider, in arrival order.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<SeenRequest>>>);

impl Recorder {
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.0.lock().unwrap().clone()
    }

    fn record(&self, request: &Request<Incoming>) {
        let cookie = request
            .headers()
            .get(axum::http::header::COOKIE)
            .map(|v| v.to_str().unwrap().to_string());
        let path_and_query = request
            .uri()
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_default();
        self.0.lock().unwrap().push(SeenRequest {
            path_and_query,
            cookie,
        });
    }
}

/// Start an HTTP/2 (prior knowledge) mock provider on an ephemeral local port.
pub async fn start_provider<F, Fut>(handler: F) -> (SocketAddr, Recorder)
where
    F: Fn(Request<Incoming>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorder = Recorder::default();
    let seen = recorder.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = handler.clone();
            let seen = seen.clone();
            tokio::spawn(async move {
                let service = service_fn(move |request: Request<Incoming>| {
                    seen.record(&request);
                    let response = handler(request);
                    async move { Ok::<_, Infallible>(response.await) }
                });
                let _ = http2::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(socket), service)
                    .await;
            });
        }
    });

    (addr, recorder)
}

/// A listener that accepts and immediately drops every connection.
pub async fn start_dropping_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });
    addr
}

/// Start a provider speaking raw HTTP/2 frames, one `respond` call per stream.
///
/// With `close_after` set, the connection is torn down with a TCP reset that
/// long after the first stream arrives.
pub async fn start_frame_provider<F, Fut>(respond: F, close_after: Option<Duration>) -> SocketAddr
where
    F: Fn(SendResponse<Bytes>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = respond.clone();
            tokio::spawn(async move {
                if close_after.is_some() {
                    #[allow(deprecated)]
                    socket.set_linger(Some(Duration::ZERO)).unwrap();
                }
                let Ok(mut conn) = h2::server::handshake(socket).await else {
                    return;
                };
                let Some(Ok((_request, stream))) = conn.accept().await else {
                    return;
                };
                tokio::spawn(respond(stream));
                match close_after {
                    // Keeps driving the connection so queued frames are flushed.
                    Some(after) => {
                        let _ = tokio::time::timeout(after, conn.accept()).await;
                    }
                    None => while let Some(Ok(_)) = conn.accept().await {},
                }
            });
        }
    });

    addr
}

/// Provider that resets every request stream before answering.
pub async fn start_resetting_provider() -> SocketAddr {
    start_frame_provider(
        |mut stream: SendResponse<Bytes>| async move {
            stream.send_reset(Reason::INTERNAL_ERROR);
        },
        None,
    )
    .await
}

/// Provider that sends headers and one chunk, then resets the stream.
pub async fn start_mid_body_resetting_provider() -> SocketAddr {
    start_frame_provider(
        |mut stream: SendResponse<Bytes>| async move {
            let head = Response::builder().status(200).body(()).unwrap();
            let mut body = stream.send_response(head, false).unwrap();
            body.send_data(Bytes::from_static(b"partial"), false).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            body.send_reset(Reason::CANCEL);
        },
        None,
    )
    .await
}

/// Provider that answers in full, then resets the TCP connection.
pub async fn start_answer_then_reset_provider(body: &'static str) -> SocketAddr {
    start_frame_provider(
        move |mut stream: SendResponse<Bytes>| async move {
            let head = Response::builder()
                .status(302)
                .header("location", "/next")
                .body(())
                .unwrap();
            let mut send = stream.send_response(head, false).unwrap();
            send.send_data(Bytes::from_static(body.as_bytes()), true).unwrap();
        },
        Some(Duration::from_millis(100)),
    )
    .await
}

/// Body delivered as separate DATA frames with a pause between them.
pub fn chunked_body(chunks: Vec<&'static str>, pause: Duration) -> Body {
    let stream = stream::iter(chunks).then(move |chunk| async move {
        tokio::time::sleep(pause).await;
        Ok::<_, Infallible>(Bytes::from_static(chunk.as_bytes()))
    });
    Body::from_stream(stream)
}

/// Body that sends one chunk and then never ends.
pub fn stalled_body(first: &'static str) -> Body {
    let stream = stream::iter([Ok::<_, Infallible>(Bytes::from_static(first.as_bytes()))])
        .chain(stream::pending());
    Body::from_stream(stream)
}

/// Builder for a provider redirect response.
pub fn redirect(location: &str, cookies: &[&str]) -> Response<Body> {
    let mut builder = Response::builder().status(302).header("location", location);
    for cookie in cookies {
        builder = builder.header("set-cookie", *cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Dials plain TCP to a fixed local address, whatever host the hop names.
#[derive(Clone, Copy)]
pub struct LoopbackDialer(pub SocketAddr);

impl Dial for LoopbackDialer {
    type Io = TcpStream;

    async fn dial(&self, _target: &HopTarget) -> io::Result<TcpStream> {
        TcpStream::connect(self.0).await
    }
}

/// Hop client pointed at a mock provider.
pub fn hop_client(addr: SocketAddr, hop_timeout: Duration) -> H2HopClient<LoopbackDialer> {
    let deadlines = HopDeadlines {
        connect: Duration::from_secs(2),
        hop: hop_timeout,
    };
    H2HopClient::new(LoopbackDialer(addr), deadlines, 1024 * 1024)
}
