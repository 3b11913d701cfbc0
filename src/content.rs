//! Page content intake and assignment

use crate::page::HeadlessPage;
use crate::Result;
use std::io::Read;

/// The raw HTML document, read in full before any rendering starts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageContent(String);

impl PageContent {
    /// Drain `reader` to EOF. Invalid UTF-8 is replaced rather than rejected.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(Self(String::from_utf8_lossy(&buf).into_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for PageContent {
    fn from(html: String) -> Self {
        Self(html)
    }
}

impl From<&str> for PageContent {
    fn from(html: &str) -> Self {
        Self(html.to_string())
    }
}

/// Assign the document to the page, kicking off the engine's load cycle.
pub fn load_content<P: HeadlessPage + ?Sized>(content: &PageContent, page: &mut P) -> Result<()> {
    log::debug!("assigning {} bytes of content", content.len());
    page.set_content(content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_everything() {
        let html = "<html><body>hi</body></html>";
        let content = PageContent::read_from(html.as_bytes()).unwrap();
        assert_eq!(content.as_str(), html);
    }

    #[test]
    fn empty_input_is_empty_content() {
        let content = PageContent::read_from(&b""[..]).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let content = PageContent::read_from(&b"<p>\xff</p>"[..]).unwrap();
        assert_eq!(content.as_str(), "<p>\u{fffd}</p>");
    }
}
