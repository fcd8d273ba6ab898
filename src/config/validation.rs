//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Provider endpoints are absolute `https` URLs
//! - Route paths are absolute and distinct
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - The request timeout outlasts the two-hop worst case
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: expected https URL, got '{value}'")]
    InsecureUrl { field: &'static str, value: String },

    #[error("{field}: path must start with '/', got '{value}'")]
    RelativePath { field: &'static str, value: String },

    #[error("routes: path '{0}' is used by more than one route")]
    DuplicatePath(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("timeouts.request_secs ({request_secs}) must exceed the two-hop budget of {hop_budget_secs}s")]
    RequestTimeoutTooShort { request_secs: u64, hop_budget_secs: u64 },

    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_https(&mut errors, "provider.login_url", &config.provider.login_url);
    check_https(&mut errors, "provider.complete_url", &config.provider.complete_url);

    if config.provider.login_hint_domain.trim().is_empty() {
        errors.push(ValidationError::Empty("provider.login_hint_domain"));
    }
    if config.provider.account_chooser_prompt.trim().is_empty() {
        errors.push(ValidationError::Empty("provider.account_chooser_prompt"));
    }
    if config.provider.session_cookies.is_empty() {
        errors.push(ValidationError::Empty("provider.session_cookies"));
    }

    let routes = &config.routes;
    let paths = [
        ("routes.message_path", &routes.message_path),
        ("routes.initiate_path", &routes.initiate_path),
        ("routes.completion_path", &routes.completion_path),
    ];
    for (i, (field, path)) in paths.iter().enumerate() {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativePath {
                field: *field,
                value: path.to_string(),
            });
        }
        if paths[..i].iter().any(|(_, other)| other == path) {
            errors.push(ValidationError::DuplicatePath(path.to_string()));
        }
    }
    if routes.completion_redirect.is_empty() {
        errors.push(ValidationError::Empty("routes.completion_redirect"));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.connect_secs", timeouts.connect_secs),
        ("timeouts.hop_secs", timeouts.hop_secs),
        ("timeouts.request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }
    // Flow A makes two hops, each with its own connect and hop deadline.
    let hop_budget_secs = timeouts
        .connect_secs
        .saturating_add(timeouts.hop_secs)
        .saturating_mul(2);
    if timeouts.request_secs != 0 && timeouts.request_secs <= hop_budget_secs {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: timeouts.request_secs,
            hop_budget_secs,
        });
    }
    if config.limits.max_hop_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_hop_body_bytes"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_https(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "https" && url.has_host() => {}
        Ok(_) => errors.push(ValidationError::InsecureUrl {
            field,
            value: value.to_string(),
        }),
        Err(_) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}
