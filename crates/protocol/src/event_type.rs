//! The closed set of envelope `type` values.
//!
//! Anything outside this set is not a protocol violation by itself — the
//! multiplexer dispatch simply has no handler for it and drops the frame,
//! logged at debug level.

/// Client → Gateway: open a session.
pub const SESSION_START: &str = "session.start";
/// Client → Gateway: a finalized user utterance.
pub const USER_AUDIO_TRANSCRIPT_FINAL: &str = "user.audio.transcript.final";
/// Client → Gateway: the result of a previously dispatched `tool.call`.
pub const TOOL_RESULT: &str = "tool.result";
/// Client → Gateway: playback of the assistant's speech was interrupted.
pub const AUDIO_OUTPUT_INTERRUPTED: &str = "audio.output.interrupted";
/// Client → Gateway: informational ack that a prior `agent.status` completed client-side.
pub const AGENT_COMPLETED: &str = "agent.completed";

/// Gateway → Client: session accepted, echoes the session id.
pub const SESSION_STARTED: &str = "session.started";
/// Gateway → Client: a simulated-streaming chunk of assistant speech.
pub const ASSISTANT_SPEECH_PARTIAL: &str = "assistant.speech.partial";
/// Gateway → Client: the final, complete assistant utterance for this round.
pub const ASSISTANT_SPEECH_FINAL: &str = "assistant.speech.final";
/// Gateway → Client: the model requested a tool call; suspends the round.
pub const TOOL_CALL: &str = "tool.call";
/// Gateway → Client: conductor loop progress (e.g. round count, busy/idle).
pub const AGENT_STATUS: &str = "agent.status";
/// Gateway → Client: reserved for a future UI-patch channel. Never emitted.
pub const ASSISTANT_UI_PATCH: &str = "assistant.ui.patch";

/// Bidirectional: a protocol or processing error.
pub const ERROR: &str = "error";
