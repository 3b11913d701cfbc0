//! Positional argument decoding
//!
//! ```text
//! domshot width height top left [cookie_domain cookie_string] [--debug]
//! ```
//!
//! The parser never fails. Geometry that does not parse as a number becomes
//! `NaN` and missing optional fields become `None`; whatever the engine makes
//! of that is the result. Callers that want validation must do it before
//! spawning the renderer.

use crate::{ClipRegion, Viewport};

/// The literal token that switches on the debug handshake.
pub const DEBUG_FLAG: &str = "--debug";

/// Index of the first argument after the four geometry values.
const FIRST_OPTIONAL: usize = 5;

/// Fully decoded render arguments. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub left: f64,
    pub cookie_domain: Option<String>,
    pub cookie_string: Option<String>,
    pub debug: bool,
}

impl RenderConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.width,
            height: self.height,
        }
    }

    /// The captured window: scroll offsets from the config, size from the viewport.
    pub fn clip(&self) -> ClipRegion {
        ClipRegion {
            top: self.top,
            left: self.left,
            width: self.width,
            height: self.height,
        }
    }
}

/// Decode a full argv (program name first) into a [`RenderConfig`].
///
/// The debug token is honoured in exactly two places: directly after the
/// geometry (debug without cookies) or as the very last argument (debug with
/// cookies). A token consumed as the flag is never also read as a cookie
/// field; anywhere else it is just a string.
pub fn parse_args<I, S>(argv: I) -> RenderConfig
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = argv.into_iter().map(Into::into).collect();

    let flag_after_geometry = args.len() > FIRST_OPTIONAL && args[FIRST_OPTIONAL] == DEBUG_FLAG;
    let flag_last = args.len() > FIRST_OPTIONAL && args.last().map(String::as_str) == Some(DEBUG_FLAG);
    let debug = flag_after_geometry || flag_last;

    // Optional fields, with a recognised flag token stripped out.
    let optional = |idx: usize| -> Option<String> {
        let value = args.get(idx)?;
        let is_flag = value == DEBUG_FLAG
            && ((idx == FIRST_OPTIONAL && flag_after_geometry) || (idx + 1 == args.len() && flag_last));
        (!is_flag).then(|| value.clone())
    };

    RenderConfig {
        width: pixels(args.get(1)),
        height: pixels(args.get(2)),
        top: pixels(args.get(3)),
        left: pixels(args.get(4)),
        cookie_domain: optional(FIRST_OPTIONAL),
        cookie_string: optional(FIRST_OPTIONAL + 1),
        debug,
    }
}

/// Decimal pixel value; anything unparseable (or absent) is `NaN`.
fn pixels(arg: Option<&String>) -> f64 {
    arg.and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
