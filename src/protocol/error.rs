//! Signaling error taxonomy
//!
//! Errors produced while handling a client request. The `Display` form
//! is the string that goes on the wire in the reply's `error` field; a
//! request failure never tears down the connection or any registry state.

use crate::media::engine::EngineError;
use crate::media::types::{MediaKind, PeerId};

/// Error produced while handling a client request
#[derive(Debug, Clone)]
pub enum SignalError {
    /// The media engine has not been provided yet
    NotReady,
    /// A referenced resource does not exist
    NotFound {
        /// What was looked up ("producer transport", "producer", ...)
        resource: &'static str,
        /// Id it was looked up by
        id: String,
    },
    /// Subscriber capabilities cannot consume the requested producer
    CannotConsume { remote_id: PeerId, kind: MediaKind },
    /// The media engine refused an operation
    Engine(EngineError),
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::NotReady => write!(f, "Router not ready"),
            SignalError::NotFound { resource, id } => {
                write!(f, "{} not found: {}", resource, id)
            }
            SignalError::CannotConsume { remote_id, kind } => {
                write!(
                    f,
                    "cannot consume {} from {}: incompatible rtp capabilities",
                    kind, remote_id
                )
            }
            SignalError::Engine(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SignalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SignalError::Engine(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EngineError> for SignalError {
    fn from(e: EngineError) -> Self {
        SignalError::Engine(e)
    }
}
