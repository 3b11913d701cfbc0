//! Chrome DevTools Protocol backend
//!
//! Launches one headless Chrome, drives a single tab through the
//! [`HeadlessPage`] operations, and tears the browser down when the
//! [`Session`] is dropped (or when [`shutdown`] is called from a signal
//! handler).

use crate::page::{CookieParam, HeadlessPage, RESUME_BINDING};
use crate::{ClipRegion, EngineConfig, Error, RenderConfig, Result, Viewport};
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::{RequestInterceptor, RequestPausedDecision, Tab};
use headless_chrome::protocol::cdp::Fetch::events::RequestPausedEvent;
use headless_chrome::protocol::cdp::Fetch::{FulfillRequest, HeaderEntry};
use headless_chrome::protocol::cdp::{Emulation, Page};
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Effectively unbounded wait for CDP calls and browser idleness. Loads have
/// no timeout and a paused breakpoint may sit for as long as the human needs.
const UNBOUNDED: Duration = Duration::from_secs(60 * 60 * 24);

/// Resolves once the current document has fired `load`.
const LOAD_WAIT_SCRIPT: &str = r#"new Promise(function(resolve) {
    if (document.readyState === 'complete') { resolve(true); return; }
    window.addEventListener('load', function() { resolve(true); }, { once: true });
})"#;

/// Shared owner of the browser process, so a signal handler can kill it.
pub type BrowserSlot = Arc<Mutex<Option<Browser>>>;

/// Drop the browser held in `slot`, terminating the Chrome process.
pub fn shutdown(slot: &BrowserSlot) {
    match slot.lock() {
        Ok(mut guard) => {
            if guard.take().is_some() {
                info!("headless browser shut down");
            }
        }
        Err(poisoned) => {
            poisoned.into_inner().take();
        }
    }
}

/// Scoped ownership of the engine: one browser, one page.
pub struct Session {
    browser: BrowserSlot,
    page: CdpPage,
}

impl Session {
    /// Launch headless Chrome sized to the render viewport.
    ///
    /// In debug mode the remote-debugging port from `engine` is exposed for
    /// the human inspector and the resume binding is installed on the page.
    pub fn launch(engine: EngineConfig, render: &RenderConfig) -> Result<Self> {
        let port = render.debug.then_some(engine.debug_port);
        let launch_options = launch_options(&engine, render)?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;
        info!("headless browser launched (pid {:?})", browser.get_process_id());

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(UNBOUNDED);

        let mut page = CdpPage {
            tab,
            clip: None,
            document_url: render.cookie_domain.as_deref().map(|d| format!("http://{}/", d)),
            navigated: false,
            resume_rx: None,
            inspector: port.map(|p| format!("http://127.0.0.1:{}", p)),
        };
        if render.debug {
            page.install_resume_binding()?;
        }

        Ok(Self {
            browser: Arc::new(Mutex::new(Some(browser))),
            page,
        })
    }

    pub fn page_mut(&mut self) -> &mut CdpPage {
        &mut self.page
    }

    /// A handle that can shut the browser down from another thread.
    pub fn browser_slot(&self) -> BrowserSlot {
        Arc::clone(&self.browser)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        shutdown(&self.browser);
    }
}

/// A single Chrome tab implementing [`HeadlessPage`]
///
/// Without a cookie domain, content is written straight into the blank
/// document. With one, the tab navigates to `http://<domain>/` and that one
/// document request is fulfilled with the content, so the page is same-site
/// with its cookies and relative URLs resolve against the domain.
pub struct CdpPage {
    tab: Arc<Tab>,
    clip: Option<ClipRegion>,
    document_url: Option<String>,
    navigated: bool,
    resume_rx: Option<Receiver<()>>,
    inspector: Option<String>,
}

impl CdpPage {
    fn serve_document(&mut self, url: &str, html: &str) -> Result<()> {
        let pending = Arc::new(Mutex::new(Some(html.as_bytes().to_vec())));
        let target = url.to_string();

        let interceptor: Arc<dyn RequestInterceptor + Send + Sync> = Arc::new(
            move |_transport, _session_id, event: RequestPausedEvent| {
                if event.params.request.url != target {
                    return RequestPausedDecision::Continue(None);
                }
                let body = match pending.lock() {
                    Ok(mut slot) => slot.take(),
                    Err(_) => None,
                };
                match body {
                    Some(body) => RequestPausedDecision::Fulfill(FulfillRequest {
                        request_id: event.params.request_id.clone(),
                        response_code: 200,
                        response_headers: Some(vec![HeaderEntry {
                            name: "Content-Type".to_string(),
                            value: "text/html; charset=utf-8".to_string(),
                        }]),
                        binary_response_headers: None,
                        body: Some(base64::engine::general_purpose::STANDARD.encode(&body)),
                        response_phrase: None,
                    }),
                    None => RequestPausedDecision::Continue(None),
                }
            },
        );

        self.tab
            .enable_fetch(None, Some(false))
            .map_err(|e| Error::LoadError(format!("Failed to enable fetch domain: {}", e)))?;
        self.tab
            .enable_request_interception(interceptor)
            .map_err(|e| Error::LoadError(format!("Failed to enable request interception: {}", e)))?;
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation to {} failed: {}", url, e)))?;
        self.navigated = true;
        Ok(())
    }

    fn install_resume_binding(&mut self) -> Result<()> {
        let (tx, rx) = mpsc::channel::<()>();
        let tx = Mutex::new(tx);

        self.tab
            .expose_function(
                RESUME_BINDING,
                Arc::new(move |_payload: serde_json::Value| {
                    debug!("resume requested from inspector");
                    if let Ok(tx) = tx.lock() {
                        let _ = tx.send(());
                    }
                }),
            )
            .map_err(|e| Error::InitializationError(format!("Failed to expose resume binding: {}", e)))?;

        // The raw binding accepts exactly one string argument.
        self.tab
            .evaluate(&resume_shim(), false)
            .map_err(|e| Error::InitializationError(format!("Failed to install resume shim: {}", e)))?;

        self.resume_rx = Some(rx);
        Ok(())
    }
}

impl HeadlessPage for CdpPage {
    fn add_cookie(&mut self, cookie: &CookieParam) -> Result<()> {
        use headless_chrome::protocol::cdp::Network::CookieParam as NetCookieParam;

        let param = NetCookieParam {
            name: cookie.name.clone(),
            value: cookie.value.clone(),
            url: None,
            domain: Some(cookie.domain.clone()),
            path: Some("/".to_string()),
            secure: None,
            http_only: None,
            same_site: None,
            expires: None,
            priority: None,
            same_party: None,
            source_scheme: None,
            source_port: None,
            partition_key: None,
        };

        self.tab
            .set_cookies(vec![param])
            .map_err(|e| Error::Other(format!("Failed to set cookie {}: {}", cookie.name, e)))?;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        let (width, height) = (pixels(viewport.width), pixels(viewport.height));
        self.tab
            .call_method(Emulation::SetDeviceMetricsOverride {
                width,
                height,
                device_scale_factor: 1.0,
                mobile: false,
                scale: None,
                screen_width: None,
                screen_height: None,
                position_x: None,
                position_y: None,
                dont_set_visible_size: None,
                screen_orientation: None,
                viewport: None,
                display_feature: None,
                device_posture: None,
            })
            .map_err(|e| Error::InitializationError(format!("Failed to set viewport: {}", e)))?;
        Ok(())
    }

    fn set_clip(&mut self, clip: ClipRegion) -> Result<()> {
        self.clip = Some(clip);
        Ok(())
    }

    fn set_content(&mut self, html: &str) -> Result<()> {
        if let Some(url) = self.document_url.clone() {
            return self.serve_document(&url, html);
        }

        // The main frame of a page target shares the target's id.
        let frame_id = self.tab.get_target_id().to_string();
        self.tab
            .call_method(Page::SetDocumentContent {
                frame_id,
                html: html.to_string(),
            })
            .map_err(|e| Error::LoadError(format!("Failed to assign content: {}", e)))?;
        Ok(())
    }

    fn wait_for_load(&mut self) -> Result<()> {
        if self.navigated {
            self.tab
                .wait_until_navigated()
                .map_err(|e| Error::LoadError(format!("Wait for navigation failed: {}", e)))?;
        }
        self.tab
            .evaluate(LOAD_WAIT_SCRIPT, true)
            .map_err(|e| Error::LoadError(format!("Waiting for load failed: {}", e)))?;
        Ok(())
    }

    fn render(&mut self) -> Result<Vec<u8>> {
        let clip = self.clip.map(|c| Page::Viewport {
            x: c.left,
            y: c.top,
            width: c.width,
            height: c.height,
            scale: 1.0,
        });

        let shot = self
            .tab
            .call_method(Page::CaptureScreenshot {
                format: Some(Page::CaptureScreenshotFormatOption::Png),
                clip,
                from_surface: Some(true),
                quality: None,
                capture_beyond_viewport: Some(true),
                optimize_for_speed: None,
            })
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))?;

        base64::engine::general_purpose::STANDARD
            .decode(shot.data)
            .map_err(|e| Error::RenderError(format!("Screenshot was not valid base64: {}", e)))
    }

    fn suspension_point(&mut self) -> Result<Duration> {
        let start = Instant::now();
        self.tab
            .evaluate("debugger;", false)
            .map_err(|e| Error::ScriptError(format!("Breakpoint evaluation failed: {}", e)))?;
        Ok(start.elapsed())
    }

    fn await_reentry(&mut self) -> Result<()> {
        let rx = self.resume_rx.as_ref().ok_or(Error::InspectorDetached)?;
        rx.recv().map_err(|_| Error::InspectorDetached)
    }

    fn inspector_endpoint(&self) -> Option<String> {
        self.inspector.clone()
    }
}

fn launch_options(engine: &EngineConfig, render: &RenderConfig) -> Result<LaunchOptions<'static>> {
    LaunchOptions::default_builder()
        .headless(true)
        .sandbox(engine.sandbox)
        .window_size(window_size(render.viewport()))
        .port(render.debug.then_some(engine.debug_port))
        .path(engine.chrome_path.clone())
        .idle_browser_timeout(UNBOUNDED)
        .build()
        .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))
}

/// Rebinds the resume binding so a bare `__domshot_resume()` sends one JSON
/// string payload.
fn resume_shim() -> String {
    format!(
        "window.{0} = (function(binding) {{ return function() {{ binding(JSON.stringify({{ resume: true }})); }}; }})(window.{0});",
        RESUME_BINDING
    )
}

/// Convert a pixel value to the protocol's unsigned integer; garbage is 0.
fn pixels(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.round() as u32
    } else {
        0
    }
}

fn window_size(viewport: Viewport) -> Option<(u32, u32)> {
    match (pixels(viewport.width), pixels(viewport.height)) {
        (0, _) | (_, 0) => {
            warn!("viewport {:?} has no usable size, using the browser default window", viewport);
            None
        }
        size => Some(size),
    }
}
