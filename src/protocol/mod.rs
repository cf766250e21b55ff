//! Wire protocol for the signaling channel
//!
//! JSON text frames over WebSocket. Clients send request frames with a
//! correlation id, the server answers each with exactly one reply frame,
//! and pushes events (`welcome`, `newProducer`, `producerClosed`)
//! whenever session state changes that the client should see.

pub mod error;
pub mod frame;
pub mod message;

pub use error::SignalError;
pub use frame::{ReplyFrame, RequestFrame};
pub use message::{ClientRequest, ResponseData, ServerEvent};
