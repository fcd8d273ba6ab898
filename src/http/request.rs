//! Inbound request helpers.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the caller sent none
//! - Pull the `user` parameter and `Cookie` headers out of a request
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Query parsing is lenient: malformed pairs are skipped, not rejected

use std::borrow::Cow;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::form_urlencoded;
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Query parameter naming the user for Flow A.
pub const USER_PARAM: &str = "user";

/// Issues a fresh UUID v4 per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV4;

impl MakeRequestId for MakeRequestUuidV4 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of an inbound request, or `"unknown"` when the layer did not run.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// First `user` value in a raw query string.
pub fn user_param(raw_query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(raw_query?.as_bytes())
        .find(|(key, _)| key == USER_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Every `Cookie` header value; invalid UTF-8 is replaced, never dropped.
pub fn cookie_headers(headers: &HeaderMap) -> Vec<Cow<'_, str>> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .collect()
}
