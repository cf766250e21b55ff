//! Session registry for live media resources
//!
//! The registry is the single source of truth for which transports,
//! producers and consumers exist at any moment, keyed by owning peer.
//! Entries hold `Arc` handles to engine objects; the registry itself
//! never calls into the engine.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SessionRegistry>
//!             ┌────────────────────────────────────────┐
//!             │ transports: (peer, direction) -> Arc   │
//!             │ producers:  (peer, kind)      -> Arc   │
//!             │ consumers:  (local, remote,   -> Arc   │
//!             │              kind)                     │
//!             └───────────────────┬────────────────────┘
//!                                 │
//!          ┌──────────────────────┼──────────────────────┐
//!          │                      │                      │
//!          ▼                      ▼                      ▼
//!     [Handlers]          [Close observers]       [Peer cleanup]
//!     get/insert          remove_*_if             remove + close
//! ```
//!
//! # Cardinality
//!
//! The composite keys make the per-peer limits structural: at most one
//! send and one recv transport per peer, one producer per kind, one
//! consumer per remote producer. An insert at an occupied key returns
//! the displaced entry so the caller can close it.

pub mod key;
pub mod store;

pub use key::{ConsumerKey, ProducerKey, TransportKey};
pub use store::SessionRegistry;
