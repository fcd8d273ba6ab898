//! Authorization redirect rewriting.
//!
//! The provider's authorization URL asks the identity provider to show an
//! account chooser and to return to the provider's own completion page. The
//! relay swaps the chooser for a login hint and points the return state at
//! its own completion route.
//!
//! Query pairs are handled one at a time on the raw (still encoded) query so
//! untouched pairs keep their exact upstream encoding.

use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;
use url::form_urlencoded;
use url::Url;

/// Unreserved characters stay literal, everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Login hints keep `@` readable.
const LOGIN_HINT: &AsciiSet = &COMPONENT.remove(b'@');

const STATE_PARAM: &str = "state";
const REDIRECT_KEY: &str = "redir";
const PROMPT_PARAM: &str = "prompt";
const LOGIN_HINT_PARAM: &str = "login_hint";

/// What to change in the authorization URL.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizeRewrite<'a> {
    /// `prompt` value to replace (e.g. `select_account`).
    pub account_chooser_prompt: &'a str,

    /// Full login hint, e.g. `user@contoso.com`.
    pub login_hint: &'a str,

    /// Local path the provider should return to after login.
    pub completion_path: &'a str,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("authorization URL has no state parameter")]
    MissingState,

    #[error("state parameter has no 'redir' entry")]
    MissingRedirect,
}

/// Apply the login hint and completion-state rewrite to an authorization URL.
pub fn rewrite_authorize_location(
    location: &Url,
    rewrite: &AuthorizeRewrite<'_>,
) -> Result<String, RewriteError> {
    let hint_pair = format!(
        "{}={}",
        LOGIN_HINT_PARAM,
        utf8_percent_encode(rewrite.login_hint, LOGIN_HINT)
    );

    let mut pairs: Vec<Cow<'_, str>> = Vec::new();
    let mut hint_placed = false;
    let mut state_rewritten = false;

    for raw in location.query().unwrap_or_default().split('&') {
        if raw.is_empty() {
            continue;
        }
        let (key, value) = decode_pair(raw);
        match key.as_ref() {
            PROMPT_PARAM if value == rewrite.account_chooser_prompt => {
                if !hint_placed {
                    pairs.push(Cow::Owned(hint_pair.clone()));
                    hint_placed = true;
                }
            }
            LOGIN_HINT_PARAM => {}
            STATE_PARAM if !state_rewritten => {
                let state = rewrite_state(&value, rewrite.completion_path)?;
                pairs.push(Cow::Owned(format!(
                    "{}={}",
                    STATE_PARAM,
                    utf8_percent_encode(&state, COMPONENT)
                )));
                state_rewritten = true;
            }
            _ => pairs.push(Cow::Borrowed(raw)),
        }
    }

    if !state_rewritten {
        return Err(RewriteError::MissingState);
    }
    if !hint_placed {
        pairs.push(Cow::Owned(hint_pair));
    }

    let mut rewritten = location.clone();
    rewritten.set_query(Some(&pairs.join("&")));
    Ok(rewritten.into())
}

/// Replace the `redir` entry of a decoded state value, keeping any other entries.
fn rewrite_state(state: &str, completion_path: &str) -> Result<String, RewriteError> {
    let mut found = false;
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(state.as_bytes()) {
        if key == REDIRECT_KEY && !found {
            serializer.append_pair(&key, completion_path);
            found = true;
        } else {
            serializer.append_pair(&key, &value);
        }
    }
    if !found {
        return Err(RewriteError::MissingRedirect);
    }
    Ok(serializer.finish())
}

fn decode_pair(raw: &str) -> (Cow<'_, str>, Cow<'_, str>) {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .unwrap_or((Cow::Borrowed(""), Cow::Borrowed("")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORIZE: &str = "https://login.microsoftonline.com/c74da02d/oauth2/v2.0/authorize?response_type=code+id_token&redirect_uri=https%3A%2F%2Fswa.azurestaticapps.net%2F.auth%2Flogin%2Faad%2Fcallback&client_id=6c3576f7&scope=openid+profile+email&response_mode=form_post&prompt=select_account&nonce=c7f096cd_20260102131407&state=redir%3D%252F.auth%252Fcomplete";

    fn rewrite() -> AuthorizeRewrite<'static> {
        AuthorizeRewrite {
            account_chooser_prompt: "select_account",
            login_hint: "bing.whatman@contoso.com",
            completion_path: "/api/login-aad-complete",
        }
    }

    #[test]
    fn test_rewrite_authorize_location() {
        let url = Url::parse(AUTHORIZE).unwrap();
        let rewritten = rewrite_authorize_location(&url, &rewrite()).unwrap();

        assert_eq!(
            rewritten,
            "https://login.microsoftonline.com/c74da02d/oauth2/v2.0/authorize?response_type=code+id_token&redirect_uri=https%3A%2F%2Fswa.azurestaticapps.net%2F.auth%2Flogin%2Faad%2Fcallback&client_id=6c3576f7&scope=openid+profile+email&response_mode=form_post&login_hint=bing.whatman@contoso.com&nonce=c7f096cd_20260102131407&state=redir%3D%252Fapi%252Flogin-aad-complete"
        );
        assert!(!rewritten.contains("prompt=select_account"));
    }

    #[test]
    fn test_login_hint_appended_without_prompt() {
        let url = Url::parse("https://idp.example/authorize?client_id=a&state=redir%3D%252F").unwrap();
        let rewritten = rewrite_authorize_location(&url, &rewrite()).unwrap();
        assert!(rewritten.ends_with("&login_hint=bing.whatman@contoso.com"));
        assert!(rewritten.contains("state=redir%3D%252Fapi%252Flogin-aad-complete"));
    }

    #[test]
    fn test_other_prompt_values_kept() {
        let url = Url::parse("https://idp.example/authorize?prompt=consent&login_hint=old%40x.com&state=redir%3D%252F").unwrap();
        let rewritten = rewrite_authorize_location(&url, &rewrite()).unwrap();
        assert!(rewritten.contains("prompt=consent"));
        assert!(!rewritten.contains("old%40x.com"));
        assert_eq!(rewritten.matches("login_hint=").count(), 1);
    }

    #[test]
    fn test_user_input_is_escaped() {
        let url = Url::parse("https://idp.example/authorize?state=redir%3D%252F").unwrap();
        let hostile = AuthorizeRewrite {
            login_hint: "a&prompt=none@contoso.com",
            ..rewrite()
        };
        let rewritten = rewrite_authorize_location(&url, &hostile).unwrap();
        assert!(rewritten.contains("login_hint=a%26prompt%3Dnone@contoso.com"));
    }

    #[test]
    fn test_state_keeps_other_entries() {
        let url = Url::parse("https://idp.example/authorize?state=id%3D7%26redir%3D%252F.auth%252Fcomplete").unwrap();
        let rewritten = rewrite_authorize_location(&url, &rewrite()).unwrap();
        assert!(rewritten.contains("state=id%3D7%26redir%3D%252Fapi%252Flogin-aad-complete"));
    }

    #[test]
    fn test_missing_state() {
        let url = Url::parse("https://idp.example/authorize?prompt=select_account").unwrap();
        assert_eq!(
            rewrite_authorize_location(&url, &rewrite()),
            Err(RewriteError::MissingState)
        );
    }

    #[test]
    fn test_state_without_redirect() {
        let url = Url::parse("https://idp.example/authorize?state=opaque").unwrap();
        assert_eq!(
            rewrite_authorize_location(&url, &rewrite()),
            Err(RewriteError::MissingRedirect)
        );
    }
}
