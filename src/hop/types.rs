//! Hop request/result types and error definitions.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use thiserror::Error;
use url::Url;

use crate::cookie::fold_cookie_header;

/// One outbound GET to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopRequest {
    /// Absolute target URL.
    pub target_url: Url,

    /// Raw cookie strings to forward, if any.
    pub cookie_header: Option<Vec<String>>,
}

impl HopRequest {
    /// A hop with no cookies.
    pub fn new(target_url: Url) -> Self {
        Self {
            target_url,
            cookie_header: None,
        }
    }

    /// Forward the given raw cookie strings. An empty list forwards nothing.
    pub fn with_cookies<I, S>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cookies: Vec<String> = cookies.into_iter().map(Into::into).collect();
        self.cookie_header = (!cookies.is_empty()).then_some(cookies);
        self
    }

    /// The single `Cookie` header value this hop sends, if any.
    pub fn cookie_value(&self) -> Option<String> {
        self.cookie_header
            .as_deref()
            .map(fold_cookie_header)
            .filter(|v| !v.is_empty())
    }
}

/// Normalized result of one completed hop.
#[derive(Debug, Clone)]
pub struct HopResult {
    pub status: StatusCode,

    /// `location` response header.
    pub location: Option<String>,

    /// Every `set-cookie` response header, in order.
    pub set_cookie: Vec<String>,

    pub headers: HeaderMap,

    /// Fully drained response body.
    pub body: Bytes,
}

impl HopResult {
    /// Build a result from response parts and the drained body.
    pub fn from_parts(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let location = headers.get(header::LOCATION).map(header_text);
        let set_cookie = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(header_text)
            .collect();

        Self {
            status,
            location,
            set_cookie,
            headers,
            body,
        }
    }
}

/// Header value as text; UTF-8 passes through, invalid bytes become U+FFFD.
fn header_text(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).into_owned()
}

/// Errors that can occur while executing a hop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HopError {
    /// Target URL cannot be used for an outbound hop.
    #[error("invalid hop target: {0}")]
    InvalidTarget(String),

    /// Session-level failure (connect, TLS, HTTP/2 connection).
    #[error("transport error: {0}")]
    Transport(String),

    /// Peer reset the request stream.
    #[error("connection reset by peer")]
    ConnectionReset,

    /// Request-level failure other than a reset.
    #[error("request error: {0}")]
    Request(String),

    /// Upstream body exceeded the configured limit.
    #[error("response body exceeded {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Hop did not settle before its deadline.
    #[error("hop timed out after {0:?}")]
    Timeout(Duration),
}

impl HopError {
    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            HopError::InvalidTarget(_) => "invalid_target",
            HopError::Transport(_) => "transport",
            HopError::ConnectionReset => "reset",
            HopError::Request(_) => "request",
            HopError::BodyTooLarge { .. } => "body_too_large",
            HopError::Timeout(_) => "timeout",
        }
    }
}
