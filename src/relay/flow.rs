//! Login flows against the hosted identity provider.
//!
//! # Responsibilities
//! - Flow A (`initiate`): two hops, rewrite the authorization redirect, scrub the context cookie
//! - Flow B (`complete`): forward selected session cookies, clear interim cookies
//! - Map every exit path to a `RelayResponse` or a `RelayError`
//!
//! Hop N+1 never starts before hop N has completed successfully.

use std::sync::Arc;

use url::Url;

use crate::config::{ProviderConfig, RelayConfig, RoutesConfig};
use crate::cookie::{expire_directive, parse_cookie_header, scrub_domain, select_by_name};
use crate::hop::{HopClient, HopRequest, HopResult};
use crate::relay::location::{rewrite_authorize_location, AuthorizeRewrite};
use crate::relay::state::{FlowKind, FlowRun};
use crate::relay::{RelayError, RelayResponse};

/// Orchestrates the provider's multi-hop login handshake.
pub struct LoginRelay {
    hops: Arc<dyn HopClient>,
    provider: ProviderConfig,
    routes: RoutesConfig,
    login_url: Url,
    complete_url: Url,
}

impl LoginRelay {
    pub fn new(hops: Arc<dyn HopClient>, config: &RelayConfig) -> Result<Self, url::ParseError> {
        Ok(Self {
            hops,
            login_url: Url::parse(&config.provider.login_url)?,
            complete_url: Url::parse(&config.provider.complete_url)?,
            provider: config.provider.clone(),
            routes: config.routes.clone(),
        })
    }

    /// Flow A. Without a `user` the caller is sent straight to the provider login.
    pub async fn initiate(&self, user: Option<&str>) -> Result<RelayResponse, RelayError> {
        let Some(user) = user.filter(|u| !u.is_empty()) else {
            tracing::info!("No user supplied, passing through to provider login");
            return Ok(RelayResponse::redirect(self.provider.login_url.clone()));
        };

        let mut run = FlowRun::new(FlowKind::Initiate);

        let first = run
            .hop(self.hops.as_ref(), HopRequest::new(self.login_url.clone()))
            .await?;
        let next = match redirect_target(&self.login_url, &first, 1) {
            Ok(url) => url,
            Err(e) => return Err(run.fail(e)),
        };
        let context_cookie = match first_cookie(&first, 1) {
            Ok(cookie) => cookie,
            Err(e) => return Err(run.fail(e)),
        };

        let second = run
            .hop(
                self.hops.as_ref(),
                HopRequest::new(next.clone()).with_cookies(first.set_cookie.iter().cloned()),
            )
            .await?;
        let authorize = match redirect_target(&next, &second, 2) {
            Ok(url) => url,
            Err(e) => return Err(run.fail(e)),
        };
        let nonce_cookie = match first_cookie(&second, 2) {
            Ok(cookie) => cookie,
            Err(e) => return Err(run.fail(e)),
        };

        run.rewriting();
        let login_hint = format!("{}@{}", user, self.provider.login_hint_domain);
        let rewrite = AuthorizeRewrite {
            account_chooser_prompt: &self.provider.account_chooser_prompt,
            login_hint: &login_hint,
            completion_path: &self.routes.completion_path,
        };
        let location = match rewrite_authorize_location(&authorize, &rewrite) {
            Ok(location) => location,
            Err(e) => return Err(run.fail(RelayError::malformed(2, e.to_string()))),
        };
        let cookies = vec![scrub_domain(context_cookie), nonce_cookie.to_string()];

        run.responding();
        tracing::info!(
            idp = authorize.host_str().unwrap_or_default(),
            cookies = cookies.len(),
            "Redirecting to identity provider"
        );
        run.done();

        Ok(RelayResponse::redirect(location).with_cookies(cookies))
    }

    /// Flow B. `cookie_headers` are the raw inbound `Cookie` header values.
    pub async fn complete(&self, cookie_headers: &[&str]) -> Result<RelayResponse, RelayError> {
        let entries = parse_cookie_header(cookie_headers.iter().copied());
        let selected = select_by_name(&entries, &self.provider.session_cookies);
        tracing::debug!(inbound = entries.len(), forwarded = selected.len(), "Selected session cookies");

        let mut run = FlowRun::new(FlowKind::Complete);
        let result = run
            .hop(
                self.hops.as_ref(),
                HopRequest::new(self.complete_url.clone()).with_cookies(selected),
            )
            .await?;

        run.rewriting();
        let cookies: Vec<String> = self
            .provider
            .cleared_cookies
            .iter()
            .map(|name| expire_directive(name))
            .chain(result.set_cookie.iter().map(|c| scrub_domain(c)))
            .collect();

        run.responding();
        tracing::info!(
            location = %self.routes.completion_redirect,
            cookies = cookies.len(),
            "Login complete"
        );
        run.done();

        Ok(RelayResponse::redirect(self.routes.completion_redirect.clone()).with_cookies(cookies))
    }
}

/// The hop's `location`, resolved against the URL that produced it.
fn redirect_target(base: &Url, result: &HopResult, hop: u8) -> Result<Url, RelayError> {
    let location = result
        .location
        .as_deref()
        .ok_or_else(|| RelayError::malformed(hop, "missing location header"))?;
    base.join(location)
        .map_err(|e| RelayError::malformed(hop, format!("unusable location '{}': {}", location, e)))
}

fn first_cookie(result: &HopResult, hop: u8) -> Result<&str, RelayError> {
    result
        .set_cookie
        .first()
        .map(String::as_str)
        .ok_or_else(|| RelayError::malformed(hop, "missing set-cookie header"))
}
