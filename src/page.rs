//! The headless page seam
//!
//! Every pipeline stage drives the engine through [`HeadlessPage`]. The trait
//! mirrors the handful of page operations the pipeline needs and nothing
//! more, so stages can be exercised against a recording fake as well as the
//! Chrome backend.

use crate::{ClipRegion, Result, Viewport};
use std::time::Duration;

/// Name of the page binding a human calls from the inspector console.
pub const RESUME_BINDING: &str = "__domshot_resume";

/// The exact console call that re-enters the debug probe.
pub const RESUME_CALL: &str = "__domshot_resume()";

/// A cookie to install into the engine's jar before the page loads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieParam {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// Core trait for a single headless page owned by one render invocation
pub trait HeadlessPage {
    /// Install one cookie, scoped to its domain
    fn add_cookie(&mut self, cookie: &CookieParam) -> Result<()>;

    /// Set the virtual viewport used for layout
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the rectangle that [`HeadlessPage::render`] captures
    fn set_clip(&mut self, clip: ClipRegion) -> Result<()>;

    /// Assign the document content, starting the engine's load/render cycle
    fn set_content(&mut self, html: &str) -> Result<()>;

    /// Block until the load started by `set_content` has finished.
    ///
    /// Fires once per content assignment. There is no timeout: a load that
    /// never completes blocks forever.
    fn wait_for_load(&mut self) -> Result<()>;

    /// Capture the clip rectangle as PNG bytes
    fn render(&mut self) -> Result<Vec<u8>>;

    /// Execute the engine-level breakpoint and report how long execution was
    /// held there. Without an attached inspector this returns almost at once.
    fn suspension_point(&mut self) -> Result<Duration>;

    /// Block until a human re-enters the debug probe from the inspector.
    fn await_reentry(&mut self) -> Result<()>;

    /// Where a human should point a browser to inspect this page, if anywhere
    fn inspector_endpoint(&self) -> Option<String> {
        None
    }
}
