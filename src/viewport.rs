//! Viewport and clip configuration

use crate::page::HeadlessPage;
use crate::{RenderConfig, Result};
use log::debug;

/// Apply the configured viewport and clip rectangle to the page.
///
/// Must run before content is assigned: some engines start layout as soon as
/// they receive a document.
pub fn configure_viewport<P: HeadlessPage + ?Sized>(config: &RenderConfig, page: &mut P) -> Result<()> {
    let viewport = config.viewport();
    let clip = config.clip();
    debug!(
        "viewport {}x{}, clip at top={} left={}",
        viewport.width, viewport.height, clip.top, clip.left
    );
    page.set_viewport(viewport)?;
    page.set_clip(clip)
}
