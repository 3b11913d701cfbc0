//! Client wire contract
//!
//! The DOM serializer running in the client posts a JSON body describing the
//! snapshot. A transport turns it into a renderer invocation with
//! [`CaptureRequest::to_args`] and feeds [`CaptureRequest::stdin_content`] on
//! stdin. `scale` is for whoever post-processes the PNG; the renderer never
//! sees it.

use crate::clean::clean_up_html;
use crate::cookies::{cookie_domain_from_url, CookieJar};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentage meaning "leave the PNG at its rendered size".
pub const UNSCALED: u32 = 100;

fn unscaled() -> u32 {
    UNSCALED
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Serialized HTML of the snapshot
    pub content: String,
    pub width: i64,
    pub height: i64,
    #[serde(default)]
    pub top: i64,
    #[serde(default)]
    pub left: i64,
    /// Zoom factor times requested scale, as a percentage
    #[serde(default = "unscaled")]
    pub scale: u32,
    /// Absolute URL of the page the snapshot was taken from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Overrides the cookie domain derived from `prefix`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_domain: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
}

impl CaptureRequest {
    /// Cookie domain for the render: explicit, or the host of `prefix`.
    pub fn cookie_domain(&self) -> Option<String> {
        self.cookie_domain
            .clone()
            .or_else(|| self.prefix.as_deref().and_then(cookie_domain_from_url))
    }

    /// Positional renderer arguments, without the program name.
    ///
    /// Cookies are forwarded only when there is a domain to scope them to and
    /// at least one cookie, since the renderer reads them as a pair.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            self.width.to_string(),
            self.height.to_string(),
            self.top.to_string(),
            self.left.to_string(),
        ];
        if let Some(domain) = self.cookie_domain().filter(|_| !self.cookies.is_empty()) {
            let jar = CookieJar::from_entries(&domain, self.cookies.clone());
            args.push(domain);
            args.push(jar.to_cookie_string());
        }
        args
    }

    /// The HTML to feed the renderer: scripts removed and URLs made absolute
    /// when `prefix` is known, the raw snapshot otherwise.
    pub fn stdin_content(&self) -> Result<String> {
        match &self.prefix {
            Some(prefix) => clean_up_html(&self.content, prefix),
            None => Ok(self.content.clone()),
        }
    }

    /// Whether the rendered PNG still needs resizing by a post-processor.
    pub fn needs_scaling(&self) -> bool {
        self.scale != UNSCALED
    }
}
