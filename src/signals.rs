//! Engine teardown on SIGINT/SIGTERM
//!
//! A render can block forever (a load that never finishes, a debug session
//! nobody resumes). When the process is told to stop, the headless engine
//! must still be shut down instead of being orphaned.

use log::warn;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::io;

/// Runs a cleanup callback and exits with `128 + signal` on SIGINT/SIGTERM.
///
/// Dropping the guard stops listening; the callback is not run in that case.
#[derive(Debug)]
pub struct SignalGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl SignalGuard {
    pub fn new<F>(cleanup: F) -> io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(io::Error::other)?;
        let handle = signals.handle();
        let thread = std::thread::spawn(move || {
            for signal in signals.forever() {
                if signal == SIGINT || signal == SIGTERM {
                    warn!("termination signal {} received, shutting down the engine", signal);
                    cleanup();
                    std::process::exit(128 + signal);
                }
            }
        });
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
