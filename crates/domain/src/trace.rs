use serde::Serialize;

/// Structured trace events emitted across the conductor's crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: String,
    },
    SessionEvicted {
        session_id: String,
        pending_calls_failed: usize,
    },
    ToolDispatched {
        session_id: String,
        call_id: String,
        tool_name: String,
    },
    ToolResolved {
        session_id: String,
        call_id: String,
        success: bool,
    },
    ToolTimedOut {
        session_id: String,
        call_id: String,
    },
    ToolResultDroppedUnknownCall {
        session_id: String,
        call_id: String,
    },
    LlmRequest {
        provider: String,
        model: String,
        streaming: bool,
        duration_ms: u64,
        tool_calls: usize,
    },
    LlmFailed {
        provider: String,
        message: String,
    },
    RateLimited {
        session_id: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "conductor_event");
    }
}
