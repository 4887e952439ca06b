//! Session state for the voice-agent conductor.
//!
//! A [`Session`] is the sole owner of one `sessionId`'s conversation
//! history, pending tool-call bookkeeping, and resolver registry. A
//! [`SessionStore`] is the process-wide map of session id → session,
//! created lazily and never persisted across restarts. [`RateLimiter`]
//! is the per-connection sliding-window admission control from §4.2.

pub mod rate_limit;
pub mod session;
pub mod store;

pub use rate_limit::RateLimiter;
pub use session::{PendingCall, Session, ToolResolution};
pub use store::SessionStore;
