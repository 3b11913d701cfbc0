//! Cookie string parsing and installation
//!
//! Cookie strings use the `key1=val1;key2=val2` format. Each element is split
//! at its first `=` only, so values may themselves contain `=`.

use crate::page::{CookieParam, HeadlessPage};
use crate::{RenderConfig, Result};
use log::debug;
use std::collections::BTreeMap;

/// Cookies for a single domain, built once before the page loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieJar {
    domain: String,
    entries: BTreeMap<String, String>,
}

impl CookieJar {
    /// Parse `cookie_string` into a jar scoped to `domain`.
    ///
    /// Returns `None` for an empty string so that "present but empty" installs
    /// nothing, exactly like an absent string. Elements without `=` become a
    /// key with an empty value; a repeated key keeps its last value.
    pub fn parse(domain: &str, cookie_string: &str) -> Option<Self> {
        if cookie_string.is_empty() {
            return None;
        }

        let entries = cookie_string
            .split(';')
            .map(|elem| match elem.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (elem.to_string(), String::new()),
            })
            .collect();

        Some(Self {
            domain: domain.to_string(),
            entries,
        })
    }

    /// Build a jar from already-split pairs, as a client hands them over.
    pub fn from_entries<I>(domain: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            domain: domain.to_string(),
            entries: entries.into_iter().collect(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serialize back to the `key=value;key=value` wire format.
    pub fn to_cookie_string(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Install every entry into the engine, one call per cookie.
    pub fn install<P: HeadlessPage + ?Sized>(&self, page: &mut P) -> Result<()> {
        for (name, value) in self.iter() {
            debug!("installing cookie {} for {}", name, self.domain);
            page.add_cookie(&CookieParam {
                name: name.to_string(),
                value: value.to_string(),
                domain: self.domain.clone(),
            })?;
        }
        Ok(())
    }
}

/// Build the jar described by `config`, if any.
///
/// A cookie string without a domain is a caller bug; it is scoped to the
/// empty domain and left for the engine to deal with.
pub fn jar_for(config: &RenderConfig) -> Option<CookieJar> {
    let cookie_string = config.cookie_string.as_deref()?;
    let domain = config.cookie_domain.as_deref().unwrap_or_default();
    CookieJar::parse(domain, cookie_string)
}

/// Parse and install the configured cookies. Returns the installed jar.
pub fn inject_cookies<P: HeadlessPage + ?Sized>(config: &RenderConfig, page: &mut P) -> Result<Option<CookieJar>> {
    let jar = jar_for(config);
    if let Some(jar) = &jar {
        jar.install(page)?;
    }
    Ok(jar)
}

/// Derive a cookie domain (host, without port) from an absolute URL.
///
/// ```
/// use domshot::cookies::cookie_domain_from_url;
/// assert_eq!(
///     cookie_domain_from_url("http://google.com:7000/path/something?key=val").as_deref(),
///     Some("google.com")
/// );
/// assert_eq!(cookie_domain_from_url("dir/something"), None);
/// ```
pub fn cookie_domain_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed.host_str().map(str::to_string)
}
