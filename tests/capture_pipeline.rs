//! Pipeline tests against a recording page
//!
//! `RecordingPage` logs every engine call in order and renders a blank PNG the
//! size of the last clip it was given, so these tests exercise the real controller
//! without a browser.

use domshot::args::parse_args;
use domshot::capture::{CaptureController, CaptureState};
use domshot::page::{CookieParam, HeadlessPage};
use domshot::{ClipRegion, Error, PageContent, Result, Viewport};
use std::collections::VecDeque;
use std::time::Duration;

const HTML: &str = "<html><body>hi</body></html>";

#[derive(Debug, Clone)]
enum Call {
    Cookie(CookieParam),
    Viewport(Viewport),
    Clip(ClipRegion),
    Content(String),
    WaitForLoad,
    Render,
    Probe,
    Reentry,
}

#[derive(Default)]
struct RecordingPage {
    calls: Vec<Call>,
    viewport: Option<Viewport>,
    clip: Option<ClipRegion>,
    /// Scripted breakpoint hold times, consumed one per probe
    probes: VecDeque<Duration>,
    /// How many times a human will re-enter before walking away
    reentries: usize,
}

impl RecordingPage {
    fn scripted(probes: &[u64], reentries: usize) -> Self {
        Self {
            probes: probes.iter().copied().map(Duration::from_millis).collect(),
            reentries,
            ..Default::default()
        }
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(*c)).count()
    }

    fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }

    fn renders(&self) -> usize {
        self.count(|c| matches!(c, Call::Render))
    }

    fn contents(&self) -> usize {
        self.count(|c| matches!(c, Call::Content(_)))
    }

    fn cookies(&self) -> Vec<CookieParam> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Cookie(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }
}

fn blank_png(clip: Option<ClipRegion>) -> Vec<u8> {
    let side = |v: f64| if v.is_finite() && v >= 1.0 { v as u32 } else { 1 };
    let (w, h) = clip.map_or((1, 1), |c| (side(c.width), side(c.height)));

    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, w, h);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(&vec![255u8; (w * h * 4) as usize]).unwrap();
    }
    buf
}

impl HeadlessPage for RecordingPage {
    fn add_cookie(&mut self, cookie: &CookieParam) -> Result<()> {
        self.calls.push(Call::Cookie(cookie.clone()));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport = Some(viewport);
        self.calls.push(Call::Viewport(viewport));
        Ok(())
    }

    fn set_clip(&mut self, clip: ClipRegion) -> Result<()> {
        self.clip = Some(clip);
        self.calls.push(Call::Clip(clip));
        Ok(())
    }

    fn set_content(&mut self, html: &str) -> Result<()> {
        self.calls.push(Call::Content(html.to_string()));
        Ok(())
    }

    fn wait_for_load(&mut self) -> Result<()> {
        self.calls.push(Call::WaitForLoad);
        Ok(())
    }

    fn render(&mut self) -> Result<Vec<u8>> {
        self.calls.push(Call::Render);
        Ok(blank_png(self.clip))
    }

    fn suspension_point(&mut self) -> Result<Duration> {
        self.calls.push(Call::Probe);
        self.probes
            .pop_front()
            .ok_or_else(|| Error::Other("no scripted probe left".into()))
    }

    fn await_reentry(&mut self) -> Result<()> {
        self.calls.push(Call::Reentry);
        if self.reentries == 0 {
            return Err(Error::InspectorDetached);
        }
        self.reentries -= 1;
        Ok(())
    }

    fn inspector_endpoint(&self) -> Option<String> {
        Some("http://127.0.0.1:9000".to_string())
    }
}

fn png_size(bytes: &[u8]) -> (u32, u32) {
    let decoder = png::Decoder::new(bytes);
    let reader = decoder.read_info().expect("valid png");
    let info = reader.info();
    (info.width, info.height)
}

#[test]
fn renders_once_with_configured_clip() {
    let config = parse_args(["domshot", "100", "50", "0", "0"]);
    let mut page = RecordingPage::default();
    let mut out = Vec::new();
    let mut diag = Vec::new();

    let mut controller = CaptureController::new(&config, &mut page);
    controller.run(HTML.into(), &mut out, &mut diag).unwrap();
    assert_eq!(controller.state(), CaptureState::Rendered);

    assert_eq!(page.renders(), 1);
    assert_eq!(page.count(|c| matches!(c, Call::Probe)), 0);
    assert!(diag.is_empty());
    assert_eq!(png_size(&out), (100, 50));

    let clip = page.calls.iter().find_map(|c| match c {
        Call::Clip(clip) => Some(*clip),
        _ => None,
    });
    assert_eq!(
        clip,
        Some(ClipRegion {
            top: 0.0,
            left: 0.0,
            width: 100.0,
            height: 50.0
        })
    );
}

#[test]
fn call_order_is_viewport_content_load_render() {
    let config = parse_args(["domshot", "300", "200", "1000", "20"]);
    let mut page = RecordingPage::default();
    let mut out = Vec::new();
    CaptureController::new(&config, &mut page)
        .run(HTML.into(), &mut out, &mut Vec::new())
        .unwrap();
    assert_eq!(png_size(&out), (300, 200));

    let kinds: Vec<&str> = page
        .calls
        .iter()
        .map(|c| match c {
            Call::Viewport(_) => "viewport",
            Call::Clip(_) => "clip",
            Call::Content(_) => "content",
            Call::WaitForLoad => "load",
            Call::Render => "render",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, ["viewport", "clip", "content", "load", "render"]);
    assert_eq!(page.clip.map(|c| (c.top, c.left)), Some((1000.0, 20.0)));

    match &page.calls[1] {
        Call::Clip(clip) => {
            assert_eq!((clip.top, clip.left), (1000.0, 20.0));
            assert_eq!((clip.width, clip.height), (300.0, 200.0));
        }
        other => panic!("expected clip, got {:?}", other),
    }
    match &page.calls[2] {
        Call::Content(html) => assert_eq!(html, HTML),
        other => panic!("expected content, got {:?}", other),
    }
}

#[test]
fn cookie_installed_before_content() {
    let config = parse_args(["domshot", "100", "50", "0", "0", "example.com", "k=v"]);
    let mut page = RecordingPage::default();
    let mut out = Vec::new();
    CaptureController::new(&config, &mut page)
        .run(HTML.into(), &mut out, &mut Vec::new())
        .unwrap();

    assert_eq!(
        page.cookies(),
        vec![CookieParam {
            name: "k".into(),
            value: "v".into(),
            domain: "example.com".into(),
        }]
    );
    let cookie_at = page.position(|c| matches!(c, Call::Cookie(_))).unwrap();
    let content_at = page.position(|c| matches!(c, Call::Content(_))).unwrap();
    assert!(cookie_at < content_at);
    assert_eq!(page.renders(), 1);
    assert_eq!(png_size(&out), (100, 50));
}

#[test]
fn one_install_per_cookie_entry() {
    let config = parse_args(["domshot", "10", "10", "0", "0", "127.0.0.1", "a=1;b=2=3"]);
    let mut page = RecordingPage::default();
    CaptureController::new(&config, &mut page)
        .run(HTML.into(), &mut Vec::new(), &mut Vec::new())
        .unwrap();

    let cookies = page.cookies();
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.domain == "127.0.0.1"));
    assert!(cookies.iter().any(|c| c.name == "b" && c.value == "2=3"));
}

#[test]
fn absent_or_empty_cookie_string_installs_nothing() {
    for argv in [
        vec!["domshot", "10", "10", "0", "0"],
        vec!["domshot", "10", "10", "0", "0", "example.com", ""],
    ] {
        let config = parse_args(argv);
        let mut page = RecordingPage::default();
        CaptureController::new(&config, &mut page)
            .run(HTML.into(), &mut Vec::new(), &mut Vec::new())
            .unwrap();
        assert!(page.cookies().is_empty());
        assert_eq!(page.renders(), 1);
    }
}

#[test]
fn garbage_geometry_reaches_the_engine() {
    let config = parse_args(["domshot", "wide", "50", "x", "0"]);
    let mut page = RecordingPage::default();
    CaptureController::new(&config, &mut page)
        .run(HTML.into(), &mut Vec::new(), &mut Vec::new())
        .unwrap();

    let vp = page.viewport.expect("viewport was set");
    assert!(vp.width.is_nan());
    assert_eq!(vp.height, 50.0);
    assert_eq!(page.renders(), 1);
}

#[test]
fn debug_first_pass_prints_banner_and_waits() {
    let config = parse_args(["domshot", "640", "480", "120", "8", "--debug"]);
    let mut page = RecordingPage::scripted(&[3], 0);
    let mut out = Vec::new();
    let mut diag = Vec::new();

    let mut controller = CaptureController::new(&config, &mut page);
    let err = controller.run(HTML.into(), &mut out, &mut diag).unwrap_err();
    assert!(matches!(err, Error::InspectorDetached));
    assert_eq!(controller.state(), CaptureState::AwaitingDebugResume);

    assert_eq!(page.contents(), 0);
    assert_eq!(page.renders(), 0);
    assert_eq!(page.count(|c| matches!(c, Call::Reentry)), 1);
    assert!(out.is_empty());

    let banner = String::from_utf8(diag).unwrap();
    assert!(banner.contains("640"));
    assert!(banner.contains("480"));
    assert!(banner.contains("top=120"));
    assert!(banner.contains("left=8"));
    assert!(banner.contains("http://127.0.0.1:9000"));
}

#[test]
fn debug_resumed_pass_renders_once() {
    let config = parse_args(["domshot", "100", "50", "0", "0", "example.com", "k=v", "--debug"]);
    let mut page = RecordingPage::scripted(&[2, 1500], 1);
    let mut out = Vec::new();
    let mut diag = Vec::new();

    let mut controller = CaptureController::new(&config, &mut page);
    controller.run(HTML.into(), &mut out, &mut diag).unwrap();
    assert_eq!(controller.state(), CaptureState::Rendered);

    assert_eq!(page.count(|c| matches!(c, Call::Probe)), 2);
    assert_eq!(page.contents(), 1);
    assert_eq!(page.renders(), 1);
    assert_eq!(png_size(&out), (100, 50));

    // Content only after the human-resumed probe.
    let reentry_at = page.position(|c| matches!(c, Call::Reentry)).unwrap();
    let content_at = page.position(|c| matches!(c, Call::Content(_))).unwrap();
    assert!(reentry_at < content_at);

    let banner = String::from_utf8(diag).unwrap();
    assert_eq!(banner.matches("domshot debug session").count(), 1);
    assert!(banner.contains("cookie domain: example.com"));
    assert!(banner.contains("k=v"));
}

#[test]
fn debug_paused_on_first_probe_skips_banner() {
    let config = parse_args(["domshot", "100", "50", "0", "0", "--debug"]);
    let mut page = RecordingPage::scripted(&[1000], 0);
    let mut diag = Vec::new();

    CaptureController::new(&config, &mut page)
        .run(HTML.into(), &mut Vec::new(), &mut diag)
        .unwrap();

    assert!(diag.is_empty());
    assert_eq!(page.count(|c| matches!(c, Call::Reentry)), 0);
    assert_eq!(page.renders(), 1);
}

#[test]
fn unpaused_reentries_repeat_the_banner() {
    let config = parse_args(["domshot", "100", "50", "0", "0", "--debug"]);
    let mut page = RecordingPage::scripted(&[1, 999, 4000], 2);
    let mut diag = Vec::new();

    CaptureController::new(&config, &mut page)
        .run(HTML.into(), &mut Vec::new(), &mut diag)
        .unwrap();

    let banner = String::from_utf8(diag).unwrap();
    assert_eq!(banner.matches("domshot debug session").count(), 2);
    assert_eq!(page.renders(), 1);
    assert_eq!(page.contents(), 1);
}

#[test]
fn second_run_is_rejected() {
    let config = parse_args(["domshot", "100", "50", "0", "0"]);
    let mut page = RecordingPage::default();
    let mut controller = CaptureController::new(&config, &mut page);

    controller.run(HTML.into(), &mut Vec::new(), &mut Vec::new()).unwrap();
    let err = controller
        .run(PageContent::from(HTML), &mut Vec::new(), &mut Vec::new())
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyRendered));
    assert_eq!(page.renders(), 1);
}

#[test]
fn rerun_after_detached_debug_session_is_not_a_render() {
    let config = parse_args(["domshot", "100", "50", "0", "0", "--debug"]);
    let mut page = RecordingPage::scripted(&[3], 0);
    let mut controller = CaptureController::new(&config, &mut page);

    let err = controller.run(HTML.into(), &mut Vec::new(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::InspectorDetached));

    let err = controller.run(HTML.into(), &mut Vec::new(), &mut Vec::new()).unwrap_err();
    match err {
        Error::CaptureInterrupted(state) => assert_eq!(state, "AwaitingDebugResume"),
        other => panic!("expected an interrupted capture, got {:?}", other),
    }
    assert_eq!(page.renders(), 0);
}
