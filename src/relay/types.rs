//! Relay response and error definitions.

use axum::http::StatusCode;
use thiserror::Error;

use crate::hop::HopError;

/// Terminal answer for the inbound request: a redirect plus cookies to set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub location: String,

    /// `Set-Cookie` values, emitted in order.
    pub set_cookie: Vec<String>,
}

impl RelayResponse {
    /// A `302 Found` to `location` with no cookies.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FOUND,
            location: location.into(),
            set_cookie: Vec::new(),
        }
    }

    pub fn with_cookies(mut self, cookies: Vec<String>) -> Self {
        self.set_cookie = cookies;
        self
    }
}

/// Errors that end a login flow without a redirect.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    /// A hop failed; later hops were not started.
    #[error("hop {hop} failed: {source}")]
    Hop {
        hop: u8,
        #[source]
        source: HopError,
    },

    /// A hop completed but lacked something the flow needs.
    #[error("hop {hop} returned a malformed response: {reason}")]
    MalformedUpstreamResponse { hop: u8, reason: String },

    /// The final redirect cannot be written as a header.
    #[error("redirect cannot be emitted: {0}")]
    InvalidRedirect(String),
}

impl RelayError {
    pub fn malformed(hop: u8, reason: impl Into<String>) -> Self {
        Self::MalformedUpstreamResponse {
            hop,
            reason: reason.into(),
        }
    }

    /// Status returned to the caller for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Hop {
                source: HopError::Timeout(_),
                ..
            } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}
