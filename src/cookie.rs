//! Cookie wire-format handling.
//!
//! # Responsibilities
//! - Split raw `Set-Cookie` strings into a `name=value` pair and attribute segments
//! - Scrub the `domain` attribute so the browser scopes a cookie to the relay
//! - Fold `Set-Cookie` strings into a single outbound `Cookie` header
//! - Parse an inbound `Cookie` header and pick entries by name
//!
//! # Design Decisions
//! - Attribute names compare case-insensitively (`Domain`, `domain`)
//! - Segments are kept verbatim; only removed segments change the output
//! - A cookie without a `domain` attribute is returned byte-for-byte unchanged

use std::fmt;

/// A raw `Set-Cookie` value split into its segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pair: String,
    attributes: Vec<String>,
}

impl SetCookie {
    /// Split a raw `Set-Cookie` string on `;`. The first segment is always `name=value`.
    pub fn parse(raw: &str) -> Self {
        let mut segments = raw.split(';').map(str::trim);
        let pair = segments.next().unwrap_or_default().to_string();
        let attributes = segments
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { pair, attributes }
    }

    /// The `name=value` segment.
    pub fn pair(&self) -> &str {
        &self.pair
    }

    /// Drop every attribute with the given name. Returns true if anything was removed.
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|segment| {
            let key = segment.split_once('=').map(|(k, _)| k).unwrap_or(segment);
            !key.trim().eq_ignore_ascii_case(name)
        });
        self.attributes.len() != before
    }
}

impl fmt::Display for SetCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pair)?;
        for attribute in &self.attributes {
            write!(f, "; {}", attribute)?;
        }
        Ok(())
    }
}

/// Remove the `domain` attribute from a raw `Set-Cookie` string.
///
/// Idempotent: input without a `domain` attribute comes back unchanged.
pub fn scrub_domain(raw: &str) -> String {
    let mut cookie = SetCookie::parse(raw);
    if cookie.remove_attribute("domain") {
        cookie.to_string()
    } else {
        raw.to_string()
    }
}

/// Fold raw `Set-Cookie` strings into one `Cookie` header value.
///
/// Only the `name=value` portion of each cookie is forwarded, joined with `"; "`.
pub fn fold_cookie_header<S: AsRef<str>>(cookies: &[S]) -> String {
    cookies
        .iter()
        .map(|c| SetCookie::parse(c.as_ref()).pair().to_string())
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Split inbound `Cookie` header values into discrete `name=value` entries.
pub fn parse_cookie_header<'a, I>(headers: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    headers
        .into_iter()
        .flat_map(|h| h.split(';'))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// For each name in priority order, pick the first inbound entry with that exact name.
///
/// Names with no matching entry are skipped.
pub fn select_by_name<'a, N: AsRef<str>>(entries: &[&'a str], names: &[N]) -> Vec<&'a str> {
    names
        .iter()
        .filter_map(|name| {
            entries.iter().copied().find(|entry| {
                entry
                    .split_once('=')
                    .map(|(n, _)| n.trim() == name.as_ref())
                    .unwrap_or(false)
            })
        })
        .collect()
}

/// A `Set-Cookie` directive that makes the browser drop the named cookie.
pub fn expire_directive(name: &str) -> String {
    format!("{}=deleted; path=/; Max-Age=0", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_domain() {
        let raw = "StaticWebAppsAuthContextCookie=X; domain=swa.azurestaticapps.net; path=/";
        assert_eq!(scrub_domain(raw), "StaticWebAppsAuthContextCookie=X; path=/");
    }

    #[test]
    fn test_scrub_domain_keeps_other_attributes_in_order() {
        let raw = "Ctx=abc==; path=/; secure; HttpOnly; domain=swa.azurestaticapps.net; expires=Fri, 02 Jan 2026 13:14:07 GMT; SameSite=None";
        assert_eq!(
            scrub_domain(raw),
            "Ctx=abc==; path=/; secure; HttpOnly; expires=Fri, 02 Jan 2026 13:14:07 GMT; SameSite=None"
        );
    }

    #[test]
    fn test_scrub_domain_case_insensitive() {
        assert_eq!(scrub_domain("A=1; Domain=example.com; Path=/"), "A=1; Path=/");
    }

    #[test]
    fn test_scrub_domain_idempotent() {
        let raw = "Nonce=Y; path=/";
        assert_eq!(scrub_domain(raw), raw);

        // Unusual spacing survives untouched when there is nothing to remove
        let odd = "Nonce=Y;path=/;  secure";
        assert_eq!(scrub_domain(odd), odd);

        let once = scrub_domain("A=1; domain=x.net; path=/");
        assert_eq!(scrub_domain(&once), once);
    }

    #[test]
    fn test_set_cookie_segments() {
        let mut cookie = SetCookie::parse("Sess=Z==; Domain=swa.net;; HttpOnly");
        assert_eq!(cookie.pair(), "Sess=Z==");
        assert!(!cookie.remove_attribute("path"));
        assert!(cookie.remove_attribute("domain"));
        assert_eq!(cookie.to_string(), "Sess=Z==; HttpOnly");
    }

    #[test]
    fn test_fold_cookie_header() {
        let cookies = vec![
            "StaticWebAppsAuthContextCookie=X; domain=swa.azurestaticapps.net; path=/".to_string(),
            "Nonce=Y; path=/; secure".to_string(),
        ];
        assert_eq!(
            fold_cookie_header(&cookies),
            "StaticWebAppsAuthContextCookie=X; Nonce=Y"
        );
        assert_eq!(fold_cookie_header::<&str>(&[]), "");
    }

    #[test]
    fn test_select_by_name_priority_order() {
        let entries = parse_cookie_header([
            "AppServiceAuthSession=B; other=ignored; StaticWebAppsAuthContextCookie=A",
        ]);
        let selected = select_by_name(
            &entries,
            &["StaticWebAppsAuthContextCookie", "AppServiceAuthSession1", "AppServiceAuthSession"],
        );
        assert_eq!(
            selected,
            vec!["StaticWebAppsAuthContextCookie=A", "AppServiceAuthSession=B"]
        );
    }

    #[test]
    fn test_select_by_name_is_exact() {
        let entries = parse_cookie_header(["AppServiceAuthSession1=S1", "AppServiceAuthSession=S"]);
        let selected = select_by_name(&entries, &["AppServiceAuthSession"]);
        assert_eq!(selected, vec!["AppServiceAuthSession=S"]);
    }

    #[test]
    fn test_expire_directive() {
        assert_eq!(
            expire_directive("Nonce"),
            "Nonce=deleted; path=/; Max-Age=0"
        );
    }
}
