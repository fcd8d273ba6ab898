//! HTTP/2 single-hop client.
//!
//! # Responsibilities
//! - Open a fresh HTTP/2 session per hop (no pooling)
//! - Issue one GET with the folded `Cookie` header
//! - Drain the full response body before producing a result
//! - Settle exactly once across session error, request error, response and deadline
//!
//! # Event sources
//! ```text
//! session driver task ──Err / closed early───────┐
//! exchange task ───Err / Ok(headers + drained)───┼──▶ settlement cell ──▶ execute()
//! hop deadline ───Timeout────────────────────────┘
//! ```
//! A lost session is only ever reported by the session driver. After
//! settlement both tasks are aborted, which drops the connection.

use std::error::Error as StdError;
use std::io;
use std::time::Instant;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, Version};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt};
use hyper::client::conn::http2;
use hyper_util::rt::{TokioExecutor, TokioIo};

use crate::config::RelayConfig;
use crate::hop::settle;
use crate::hop::{HopClient, HopError, HopRequest, HopResult};
use crate::net::{Dial, HopTarget, TlsDialer};
use crate::observability::metrics;
use crate::resilience::timeouts::{self, HopDeadlines};

/// Single-hop client over HTTP/2.
pub struct H2HopClient<D = TlsDialer> {
    dialer: D,
    deadlines: HopDeadlines,
    max_body_bytes: usize,
}

impl H2HopClient<TlsDialer> {
    /// Production client: TLS dialer, deadlines and body limit from config.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            TlsDialer::new(),
            HopDeadlines::from(&config.timeouts),
            config.limits.max_hop_body_bytes,
        )
    }
}

impl<D: Dial> H2HopClient<D> {
    pub fn new(dialer: D, deadlines: HopDeadlines, max_body_bytes: usize) -> Self {
        Self {
            dialer,
            deadlines,
            max_body_bytes,
        }
    }

    async fn run(&self, request: HopRequest) -> Result<HopResult, HopError> {
        let target = HopTarget::from_url(&request.target_url)?;
        let outbound = build_request(&request)?;

        let (sender, connection) = timeouts::within(self.deadlines.connect, async {
            let io = self
                .dialer
                .dial(&target)
                .await
                .map_err(|e| HopError::Transport(e.to_string()))?;
            http2::handshake::<_, _, Body>(TokioExecutor::new(), TokioIo::new(io))
                .await
                .map_err(|e| HopError::Transport(e.to_string()))
        })
        .await?;

        let (settler, settled) = settle::cell::<HopResult, HopError>();

        let session_settler = settler.clone();
        let session = tokio::spawn(async move {
            let message = match connection.await {
                Ok(()) => "session closed before the hop completed".to_string(),
                Err(e) => e.to_string(),
            };
            if session_settler.settle(Err(HopError::Transport(message.clone()))) {
                tracing::warn!(error = %message, "Session error");
            } else {
                tracing::trace!(error = %message, "Session ended after settlement");
            }
        });

        let exchange_settler = settler.clone();
        let limit = self.max_body_bytes;
        let exchange = tokio::spawn(async move {
            let mut sender = sender;
            let outcome = send_and_drain(&mut sender, outbound, limit).await;
            match &outcome {
                // The session driver reports a lost session.
                Err(e) if matches!(e, HopError::Transport(_)) || sender.is_closed() => {
                    tracing::debug!(error = %e, "Request failed with the session; left to the session driver");
                    return;
                }
                Err(e) => tracing::warn!(error = %e, "Problem with GET request"),
                Ok(_) => {}
            }
            if !exchange_settler.settle(outcome) {
                tracing::debug!("Exchange finished after settlement; result dropped");
            }
            // Dropping the sender lets the session close; only after settling.
            drop(sender);
        });

        let outcome = timeouts::settle_within(self.deadlines.hop, &settler, settled).await;

        exchange.abort();
        session.abort();

        outcome
    }
}

#[async_trait]
impl<D: Dial> HopClient for H2HopClient<D> {
    async fn execute(&self, request: HopRequest) -> Result<HopResult, HopError> {
        let started = Instant::now();
        // Host and path only; queries carry nonces and state.
        let target = format!(
            "{}{}",
            request.target_url.host_str().unwrap_or_default(),
            request.target_url.path()
        );
        tracing::debug!(upstream = %target, cookies = request.cookie_header.as_ref().map_or(0, Vec::len), "Starting hop");

        let outcome = self.run(request).await;

        match &outcome {
            Ok(result) => {
                tracing::debug!(
                    upstream = %target,
                    status = %result.status,
                    body_bytes = result.body.len(),
                    has_location = result.location.is_some(),
                    set_cookies = result.set_cookie.len(),
                    "Hop completed"
                );
                metrics::record_hop("ok", started);
            }
            Err(e) => {
                tracing::warn!(upstream = %target, error = %e, "Hop failed");
                metrics::record_hop(e.kind(), started);
            }
        }

        outcome
    }
}

fn build_request(request: &HopRequest) -> Result<Request<Body>, HopError> {
    let mut url = request.target_url.clone();
    url.set_fragment(None);

    let mut builder = Request::builder()
        .method(Method::GET)
        .version(Version::HTTP_2)
        .uri(url.as_str());
    if let Some(cookie) = request.cookie_value() {
        builder = builder.header(header::COOKIE, cookie);
    }

    builder
        .body(Body::empty())
        .map_err(|e| HopError::InvalidTarget(e.to_string()))
}

async fn send_and_drain(
    sender: &mut http2::SendRequest<Body>,
    request: Request<Body>,
    limit: usize,
) -> Result<HopResult, HopError> {
    sender.ready().await.map_err(|e| request_error(&e))?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|e| request_error(&e))?;

    let (parts, body) = response.into_parts();
    let body = drain_body(Body::new(body).into_data_stream(), limit).await?;

    Ok(HopResult::from_parts(parts.status, parts.headers, body))
}

/// Collect every data chunk up to end-of-stream into one owned buffer.
pub async fn drain_body<S, E>(mut stream: S, limit: usize) -> Result<Bytes, HopError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: StdError + 'static,
{
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| request_error(&e))?;
        if buf.len() + chunk.len() > limit {
            return Err(HopError::BodyTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Map a failure seen by the exchange.
///
/// A stream reset by the peer is `ConnectionReset`. A lost session (socket
/// failure, GOAWAY, connection closed under the request) is `Transport`, the
/// same as when the session driver reports it. Anything else is `Request`.
pub fn request_error(err: &(dyn StdError + 'static)) -> HopError {
    let mut session_lost = false;
    let mut cause: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = cause {
        if let Some(h2_err) = e.downcast_ref::<h2::Error>() {
            if h2_err.is_reset() && h2_err.is_remote() {
                return HopError::ConnectionReset;
            }
            session_lost |= h2_err.is_io() || h2_err.is_go_away();
        }
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            session_lost |= hyper_err.is_canceled() || hyper_err.is_closed();
        }
        session_lost |= e.is::<io::Error>();
        cause = e.source();
    }

    if session_lost {
        HopError::Transport(err.to_string())
    } else {
        HopError::Request(err.to_string())
    }
}
