use thiserror::Error;

/// Errors raised while setting up or exporting from the debugger.
///
/// Network failures never appear here; they travel back to the caller as the
/// transport's own error.
#[derive(Debug, Error)]
pub enum DebuggerError {
    #[error("a Tokio runtime is required to start the debugger")]
    NoRuntime,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
