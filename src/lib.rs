//! domshot
//!
//! Renders a serialized DOM snapshot (an HTML string) into a PNG screenshot
//! scoped to a virtual viewport, a scroll offset and a cookie context.
//!
//! The crate is organised as a small pipeline that drives a single headless
//! page:
//!
//! - [`args`] decodes the positional process arguments into a [`RenderConfig`]
//! - [`cookies`] turns the cookie string into a [`CookieJar`] and installs it
//! - [`viewport`] sets the viewport and the clip rectangle
//! - [`content`] reads the HTML and assigns it to the page
//! - [`capture`] runs the capture state machine, including the debug handshake
//!
//! Every stage talks to the engine through the [`HeadlessPage`] trait. The
//! `cdp` feature (default) provides an implementation over headless Chrome.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "cdp")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use domshot::{args, capture::CaptureController, EngineConfig};
//!
//! let config = args::parse_args(["domshot", "100", "50", "0", "0"]);
//! let mut session = domshot::cdp::Session::launch(EngineConfig::default(), &config)?;
//! let html = "<html><body>hi</body></html>".to_string();
//!
//! let mut png = Vec::new();
//! let mut banner = Vec::new();
//! CaptureController::new(&config, session.page_mut()).run(html.into(), &mut png, &mut banner)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "cdp"))]
//! # fn main() {}
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod args;
pub mod capture;
pub mod clean;
pub mod content;
pub mod cookies;
pub mod page;
pub mod request;
pub mod viewport;

#[cfg(feature = "cdp")]
pub mod cdp;

#[cfg(unix)]
pub mod signals;

pub use args::RenderConfig;
pub use capture::{CaptureController, CaptureState};
pub use content::PageContent;
pub use cookies::CookieJar;
pub use page::HeadlessPage;
pub use request::CaptureRequest;

/// Virtual rendering surface size in CSS pixels.
///
/// Values are `f64` so that unparseable arguments can travel through the
/// pipeline as `NaN` instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Sub-rectangle of the laid-out page that ends up in the PNG.
///
/// `width`/`height` always mirror the viewport, so the clip is a pure scroll
/// window over the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRegion {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// Launch settings for the headless engine
///
/// These are ambient settings that never come from the positional render
/// arguments. See [`EngineConfig::from_env`] for the environment overrides.
///
/// # Examples
///
/// ```
/// let cfg = domshot::EngineConfig::default();
/// assert_eq!(cfg.debug_port, 9000);
/// assert!(cfg.sandbox);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit Chrome/Chromium binary; auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Remote-debugging port exposed to the human inspector in debug mode
    pub debug_port: u16,
    /// Whether to keep Chrome's sandbox enabled
    pub sandbox: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            debug_port: 9000,
            sandbox: true,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from the defaults plus `DOMSHOT_*` overrides.
    ///
    /// - `DOMSHOT_CHROME`: path to the browser binary
    /// - `DOMSHOT_DEBUG_PORT`: inspector port for `--debug` sessions
    /// - `DOMSHOT_NO_SANDBOX`: any value other than `0`/empty disables the sandbox
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(path) = lookup("DOMSHOT_CHROME").filter(|p| !p.is_empty()) {
            cfg.chrome_path = Some(PathBuf::from(path));
        }

        if let Some(port) = lookup("DOMSHOT_DEBUG_PORT") {
            cfg.debug_port = port.trim().parse().map_err(|_| {
                Error::ConfigError(format!("DOMSHOT_DEBUG_PORT is not a valid port: {:?}", port))
            })?;
        }

        if let Some(flag) = lookup("DOMSHOT_NO_SANDBOX") {
            cfg.sandbox = flag.is_empty() || flag == "0";
        }

        Ok(cfg)
    }
}
