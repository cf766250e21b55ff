//! Peer sessions, push fan-out and lifecycle
//!
//! A [`PeerSession`] is created per connection and maps protocol
//! requests onto the registry and the media engine. The [`PeerHub`]
//! routes server pushes to connection write loops, and `lifecycle`
//! holds the close observers and the teardown path that keep the
//! registry consistent with engine state.

pub mod handler;
pub mod hub;
pub(crate) mod lifecycle;

pub use handler::PeerSession;
pub use hub::PeerHub;
