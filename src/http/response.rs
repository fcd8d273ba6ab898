//! Response conversion.
//!
//! # Responsibilities
//! - Turn a `RelayResponse` into a redirect with every `Set-Cookie` value
//! - Map relay failures to 502 / 504 with an empty body
//! - Fixed bodies for the test endpoint and unknown paths

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::relay::{RelayError, RelayResponse};

impl IntoResponse for RelayResponse {
    fn into_response(self) -> Response {
        let location = match HeaderValue::try_from(self.location.as_str()) {
            Ok(value) => value,
            Err(e) => return RelayError::InvalidRedirect(e.to_string()).into_response(),
        };

        let mut response = self.status.into_response();
        let headers = response.headers_mut();
        headers.insert(header::LOCATION, location);
        for cookie in &self.set_cookie {
            match HeaderValue::try_from(cookie.as_str()) {
                Ok(value) => {
                    headers.append(header::SET_COOKIE, value);
                }
                Err(e) => {
                    return RelayError::InvalidRedirect(format!("set-cookie: {}", e)).into_response()
                }
            }
        }
        response
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}

/// Body of the test endpoint.
pub fn message() -> Response {
    Json(json!({ "testing": ["api/message"] })).into_response()
}

/// Plain-text 404 for unknown paths.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain")],
        "Not found",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hop::HopError;
    use std::time::Duration;

    async fn body_of(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_redirect_carries_every_cookie() {
        let response = RelayResponse::redirect("/login-aad-complete/")
            .with_cookies(vec!["A=deleted; path=/; Max-Age=0".into(), "Sess=Z; path=/".into()])
            .into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login-aad-complete/");
        let cookies: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["A=deleted; path=/; Max-Age=0", "Sess=Z; path=/"]);
    }

    #[tokio::test]
    async fn test_unwritable_location_is_bad_gateway() {
        let response = RelayResponse::redirect("https://idp.example/\nx").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[tokio::test]
    async fn test_errors_have_empty_body() {
        let response = RelayError::Hop {
            hop: 1,
            source: HopError::Timeout(Duration::from_secs(1)),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(body_of(response).await.is_empty());

        let response = RelayError::malformed(2, "missing location").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_of(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_message_and_not_found_bodies() {
        let response = message();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_of(response).await, br#"{"testing":["api/message"]}"#);

        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(body_of(response).await, b"Not found");
    }
}
