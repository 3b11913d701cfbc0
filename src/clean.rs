//! Snapshot clean-up before rendering
//!
//! A serialized DOM is replayed as a static document: every `<script>` is
//! dropped, and relative URLs in `link[href]`, `a[href]` and `img[src]` are
//! made absolute against the URL the snapshot was taken from.

use crate::Result;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, ParseOpts};
use log::{debug, warn};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use url::Url;

/// Elements whose URL attribute is rewritten
const URL_ATTRS: &[(&str, &str)] = &[("link", "href"), ("a", "href"), ("img", "src")];

/// Strip scripts from `html` and absolutize its URLs against `prefix`.
///
/// When `prefix` is not an absolute URL the URLs are left alone; scripts are
/// still removed.
///
/// ```
/// let html = r#"<a href="something"></a><script>alert(1)</script>"#;
/// let cleaned = domshot::clean::clean_up_html(html, "http://127.0.0.1:8000/something").unwrap();
/// assert!(cleaned.contains(r#"<a href="http://127.0.0.1:8000/something"></a>"#));
/// assert!(!cleaned.contains("script"));
/// ```
pub fn clean_up_html(html: &str, prefix: &str) -> Result<String> {
    let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);

    let base = Url::parse(prefix).ok();
    if base.is_none() {
        warn!("prefix {:?} is not an absolute URL, relative URLs kept as-is", prefix);
    }
    scrub(&dom.document, base.as_ref());

    let document: SerializableHandle = dom.document.clone().into();
    let mut bytes = Vec::new();
    serialize(&mut bytes, &document, SerializeOpts::default())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn scrub(node: &Handle, base: Option<&Url>) {
    node.children.borrow_mut().retain(|child| !is_script(child));

    if let (NodeData::Element { name, attrs, .. }, Some(base)) = (&node.data, base) {
        let tag: &str = &name.local;
        for (_, attr_name) in URL_ATTRS.iter().filter(|(t, _)| *t == tag) {
            for attr in attrs.borrow_mut().iter_mut() {
                if &*attr.name.local != *attr_name {
                    continue;
                }
                if let Some(absolute) = absolutize(base, &attr.value) {
                    debug!("{}[{}]: {} -> {}", tag, attr_name, &*attr.value, absolute);
                    attr.value = StrTendril::from_slice(&absolute);
                }
            }
        }
    }

    for child in node.children.borrow().iter() {
        scrub(child, base);
    }
}

fn is_script(node: &Handle) -> bool {
    matches!(&node.data, NodeData::Element { name, .. } if &*name.local == "script")
}

/// `None` when `value` is already absolute or cannot be joined.
fn absolutize(base: &Url, value: &str) -> Option<String> {
    if Url::parse(value).is_ok() {
        return None;
    }
    base.join(value).ok().map(String::from)
}
