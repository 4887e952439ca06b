//! Wire protocol for the conductor: the envelope codec and the closed set
//! of event types/payload shapes that flow over the client WebSocket.

pub mod envelope;
pub mod event_type;
pub mod payload;

pub use envelope::{Envelope, EnvelopeError};

/// Hard cap on a single inbound frame, mirrored from `conductor_domain::config`
/// so callers that only depend on this crate still have a sane default.
pub const DEFAULT_MAX_EVENT_BYTES: usize = 65_536;
