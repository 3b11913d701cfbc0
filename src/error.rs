//! Error types for the rendering pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the headless engine or the pipeline plumbing.
///
/// Malformed render arguments are never reported here: bad geometry or a bad
/// cookie string flows through to the engine untouched.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch or attach to the headless engine
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to assign content or wait for it to load
    #[error("Failed to load content: {0}")]
    LoadError(String),

    /// Failed to capture the clip region
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to evaluate a script in the page (debug probe, load wait)
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Invalid engine configuration (environment)
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The inspector connection went away while waiting for a resume
    #[error("Inspector detached before the debug session resumed")]
    InspectorDetached,

    /// The controller already produced its one render
    #[error("Capture already rendered; a controller renders exactly once")]
    AlreadyRendered,

    /// An earlier run stopped partway, before its render
    #[error("Capture was interrupted in state {0}; a controller runs once")]
    CaptureInterrupted(String),

    /// Reading stdin or writing stdout/stderr failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("stdout closed"));
    }
}
