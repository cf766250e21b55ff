//! Request/reply framing
//!
//! Every request carries a client-chosen correlation id; the reply echoes
//! it back with either a `data` payload or an `error` string. Pushes have
//! no id and are framed by [`ServerEvent`](super::message::ServerEvent)
//! directly.

use serde::{Deserialize, Serialize};

use super::message::{ClientRequest, ResponseData};

/// A client request with its correlation id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFrame {
    /// Correlation id, echoed in the reply
    pub id: u64,
    /// The request itself
    #[serde(flatten)]
    pub request: ClientRequest,
}

/// Reply to a request, correlated by id
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyFrame {
    /// Successful reply with a payload
    Ok { id: u64, data: ResponseData },
    /// Failed reply; the connection stays up
    Err { id: u64, error: String },
}

impl ReplyFrame {
    /// Build a successful reply
    pub fn ok(id: u64, data: ResponseData) -> Self {
        ReplyFrame::Ok { id, data }
    }

    /// Build a failed reply
    pub fn err(id: u64, error: impl Into<String>) -> Self {
        ReplyFrame::Err {
            id,
            error: error.into(),
        }
    }

    /// Correlation id of the reply
    pub fn id(&self) -> u64 {
        match self {
            ReplyFrame::Ok { id, .. } => *id,
            ReplyFrame::Err { id, .. } => *id,
        }
    }
}
