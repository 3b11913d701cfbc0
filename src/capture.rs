//! Capture controller
//!
//! Decides, once per invocation, whether to render as soon as the page has
//! loaded or to go through the two-pass debug handshake first. Every path
//! that reaches [`CaptureState::Rendered`] renders exactly once.
//!
//! ```text
//!            debug=false                      load done
//!   Idle ─────────────────► AwaitingLoad ──────────────► Rendered
//!    │                           ▲
//!    │ debug=true                │ probe >= RESUME_THRESHOLD
//!    ▼                           │
//!  probe ── probe < threshold ──►AwaitingDebugResume ──► (re-entry) probe
//! ```
//!
//! The debug handshake cannot ask the engine whether a human actually paused
//! the breakpoint, so it times it: anything held for at least
//! [`RESUME_THRESHOLD`] counts as a human-resumed pass. This is a heuristic
//! (a slow machine could cross it without a human) and is kept as-is for
//! compatibility with existing tooling.

use crate::content::{load_content, PageContent};
use crate::cookies::{inject_cookies, CookieJar};
use crate::page::{HeadlessPage, RESUME_CALL};
use crate::viewport::configure_viewport;
use crate::{Error, RenderConfig, Result};
use log::{debug, info};
use std::io::Write;
use std::time::Duration;

/// Minimum time the breakpoint must hold execution to count as human-resumed.
pub const RESUME_THRESHOLD: Duration = Duration::from_millis(1000);

/// Where the controller is in its single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Cookies/viewport may be configured; nothing loaded yet
    Idle,
    /// Content assigned, waiting for the load to complete
    AwaitingLoad,
    /// Breakpoint passed straight through; waiting for a human to re-enter
    AwaitingDebugResume,
    /// The one render happened
    Rendered,
}

/// Verdict of one pass through the debug breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Nothing paused execution: the automatic first pass
    PassedThrough,
    /// A human paused and then resumed execution
    Paused,
}

/// Classify how long the breakpoint held execution.
pub fn classify_probe(elapsed: Duration) -> ProbeOutcome {
    if elapsed < RESUME_THRESHOLD {
        ProbeOutcome::PassedThrough
    } else {
        ProbeOutcome::Paused
    }
}

/// Drives one page from configuration to a single PNG.
pub struct CaptureController<'a, P: HeadlessPage + ?Sized> {
    config: &'a RenderConfig,
    page: &'a mut P,
    state: CaptureState,
    jar: Option<CookieJar>,
}

impl<'a, P: HeadlessPage + ?Sized> CaptureController<'a, P> {
    pub fn new(config: &'a RenderConfig, page: &'a mut P) -> Self {
        Self {
            config,
            page,
            state: CaptureState::Idle,
            jar: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Run the pipeline to completion.
    ///
    /// The PNG goes to `out`. In debug mode the instructions banner goes to
    /// `diag` each time the breakpoint passes straight through, after which
    /// this call blocks in [`HeadlessPage::await_reentry`].
    pub fn run<W, D>(&mut self, content: PageContent, out: &mut W, diag: &mut D) -> Result<()>
    where
        W: Write + ?Sized,
        D: Write + ?Sized,
    {
        match self.state {
            CaptureState::Idle => {}
            CaptureState::Rendered => return Err(Error::AlreadyRendered),
            interrupted => return Err(Error::CaptureInterrupted(format!("{:?}", interrupted))),
        }

        self.jar = inject_cookies(self.config, &mut *self.page)?;
        configure_viewport(self.config, &mut *self.page)?;

        if !self.config.debug {
            return self.load_and_render(&content, out);
        }

        loop {
            let elapsed = self.page.suspension_point()?;
            debug!("breakpoint held execution for {:?}", elapsed);

            match classify_probe(elapsed) {
                ProbeOutcome::Paused => {
                    info!("debug session resumed, rendering");
                    return self.load_and_render(&content, out);
                }
                ProbeOutcome::PassedThrough => {
                    self.transition(CaptureState::AwaitingDebugResume);
                    write_banner(self.config, self.jar.as_ref(), self.page.inspector_endpoint(), diag)?;
                    diag.flush()?;
                    self.page.await_reentry()?;
                }
            }
        }
    }

    fn load_and_render<W: Write + ?Sized>(&mut self, content: &PageContent, out: &mut W) -> Result<()> {
        self.transition(CaptureState::AwaitingLoad);
        load_content(content, &mut *self.page)?;
        self.page.wait_for_load()?;

        let png = self.page.render()?;
        out.write_all(&png)?;
        out.flush()?;
        self.transition(CaptureState::Rendered);
        Ok(())
    }

    fn transition(&mut self, next: CaptureState) {
        debug!("capture state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Print the human-facing instructions for an unpaused debug pass.
pub fn write_banner<D: Write + ?Sized>(
    config: &RenderConfig,
    jar: Option<&CookieJar>,
    endpoint: Option<String>,
    diag: &mut D,
) -> Result<()> {
    writeln!(diag, "domshot debug session")?;
    writeln!(diag, "  viewport: {}x{}", config.width, config.height)?;
    writeln!(diag, "  scroll offset: top={} left={}", config.top, config.left)?;

    if let Some(jar) = jar {
        writeln!(diag, "  cookie domain: {}", jar.domain())?;
        for (name, value) in jar.iter() {
            writeln!(diag, "    {}={}", name, value)?;
        }
    } else if let Some(domain) = &config.cookie_domain {
        writeln!(diag, "  cookie domain: {} (no cookies)", domain)?;
    }

    let endpoint = endpoint.unwrap_or_else(|| "the engine's remote inspector".to_string());
    writeln!(diag)?;
    writeln!(diag, "Open {} in two browser tabs.", endpoint)?;
    writeln!(diag, "In the first, inspect the page and run {} in its console.", RESUME_CALL)?;
    writeln!(diag, "Use the second to step through the paused pass; resume it to render.")?;
    Ok(())
}
