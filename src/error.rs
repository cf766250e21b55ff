//! Crate-level error types
//!
//! These cover server setup and the accept loop. Per-request failures
//! travel as [`SignalError`](crate::protocol::SignalError) replies and
//! never surface here.

/// Error type for server operations
#[derive(Debug)]
pub enum Error {
    /// I/O failure while binding or accepting
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenience result alias for server operations
pub type Result<T> = std::result::Result<T, Error>;
