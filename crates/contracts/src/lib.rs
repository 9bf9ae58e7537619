//! # Contracts
//!
//! Shared interface contracts between the config loader, the dispatcher and
//! its callers. Business crates depend on this crate, never the reverse.
//!
//! - [`Destination`]: the byte-sink trait payloads are fanned out to
//! - [`WriteMode`]: per-call choice between queued and synchronous delivery
//! - [`FanoutBlueprint`]: file-level configuration schema

mod blueprint;
mod destination;
mod error;

pub use blueprint::*;
pub use destination::Destination;
pub use error::*;
