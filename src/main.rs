use log::error;

fn init_logging() {
    // stdout carries the PNG, so all logging goes to stderr.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
}

#[cfg(feature = "cdp")]
fn run() -> domshot::Result<()> {
    use domshot::{args, cdp, CaptureController, EngineConfig, PageContent};
    use std::io;

    let config = args::parse_args(std::env::args());
    let engine = EngineConfig::from_env()?;
    let content = PageContent::read_from(io::stdin().lock())?;

    let mut session = cdp::Session::launch(engine, &config)?;

    #[cfg(unix)]
    let _guard = {
        let slot = session.browser_slot();
        domshot::signals::SignalGuard::new(move || cdp::shutdown(&slot))?
    };

    let mut out = io::stdout();
    let mut diag = io::stderr();
    CaptureController::new(&config, session.page_mut()).run(content, &mut out, &mut diag)
}

#[cfg(not(feature = "cdp"))]
fn run() -> domshot::Result<()> {
    Err(domshot::Error::InitializationError(
        "built without a rendering backend; enable the `cdp` feature".into(),
    ))
}

fn main() {
    init_logging();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}
