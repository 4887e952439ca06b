//! A single session's state.
//!
//! All mutation happens from the one task that owns the session's socket
//! (or its suspended conductor loop). [`Session`] itself is plain data;
//! [`crate::store::SessionStore`] is what makes it reachable and
//! serializes access to it.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use conductor_domain::tool::Turn;
use tokio::sync::oneshot;

/// Rolling trace of step markers, bounded to 24 entries.
const TRACE_CAPACITY: usize = 24;

/// `(result, error)` — exactly one is `Some` per the wire contract for
/// `tool.result`. Also used for the synthetic timeout resolution.
pub type ToolResolution = (Option<String>, Option<String>);

/// A tool call dispatched to the client and awaiting `tool.result`.
#[derive(Debug, Clone)]
pub struct PendingCall {
    pub call_id: String,
    pub tool_name: String,
    pub emitted_at: DateTime<Utc>,
}

/// All state keyed by one `sessionId`.
pub struct Session {
    pub session_id: String,
    pub history: Vec<Turn>,
    pub pending_tool_calls: HashMap<String, PendingCall>,
    pub tool_result_resolvers: HashMap<String, oneshot::Sender<ToolResolution>>,
    pub recent_transcript_trace: VecDeque<String>,
    pub transcript_count: u64,
    /// Write-once at session-start; never logged.
    pub github_token: Option<String>,
    max_turns: usize,
}

impl Session {
    pub fn new(session_id: impl Into<String>, max_turns: usize) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
            pending_tool_calls: HashMap::new(),
            tool_result_resolvers: HashMap::new(),
            recent_transcript_trace: VecDeque::with_capacity(TRACE_CAPACITY),
            transcript_count: 0,
            github_token: None,
            max_turns,
        }
    }

    /// Push a turn, then truncate from the front so `len(history) <= 2 *
    /// max_turns`, always dropping whole user/assistant (and tool-call/
    /// tool-result) pairs rather than leaving a turn without its partner.
    pub fn append_turn(&mut self, turn: Turn) {
        self.history.push(turn);
        self.truncate();
    }

    fn truncate(&mut self) {
        let cap = 2 * self.max_turns;
        while self.history.len() > cap {
            let start = match self.history.first() {
                Some(Turn::System { .. }) => 1,
                _ => 0,
            };
            if start >= self.history.len() {
                break;
            }

            let mut end = start + 1;
            match &self.history[start] {
                Turn::User { .. } => {
                    // Absorb the rest of this transcript's round(s): every
                    // assistant/tool turn up to (but not including) the
                    // next user turn, keeping tool-call/tool-result pairs
                    // intact.
                    while end < self.history.len() {
                        match &self.history[end] {
                            Turn::User { .. } => break,
                            Turn::AssistantToolCalls { .. } => {
                                end += 1;
                                while end < self.history.len()
                                    && self.history[end].is_tool_pair_member()
                                {
                                    end += 1;
                                }
                            }
                            _ => end += 1,
                        }
                    }
                }
                Turn::AssistantToolCalls { .. } => {
                    while end < self.history.len() && self.history[end].is_tool_pair_member() {
                        end += 1;
                    }
                }
                _ => {}
            }

            self.history.drain(start..end);
        }
    }

    /// Rolling ring of step markers, bounded to 24.
    pub fn record_trace(&mut self, marker: impl Into<String>) {
        if self.recent_transcript_trace.len() >= TRACE_CAPACITY {
            self.recent_transcript_trace.pop_front();
        }
        self.recent_transcript_trace.push_back(marker.into());
    }

    /// Register a freshly-dispatched tool call as pending.
    pub fn register_pending(&mut self, call_id: impl Into<String>, tool_name: impl Into<String>) {
        let call_id = call_id.into();
        self.pending_tool_calls.insert(
            call_id.clone(),
            PendingCall {
                call_id,
                tool_name: tool_name.into(),
                emitted_at: Utc::now(),
            },
        );
    }

    /// Register a one-shot resolver the conductor loop is suspended on.
    pub fn register_resolver(&mut self, call_id: impl Into<String>, tx: oneshot::Sender<ToolResolution>) {
        self.tool_result_resolvers.insert(call_id.into(), tx);
    }

    /// Deliver a `tool.result` for `call_id`: remove it from
    /// `pending_tool_calls` and, if a resolver is registered, fire it.
    /// Returns `true` if a resolver was found and fired; `false` means the
    /// call was abandoned (resolver already consumed, or unknown id) and
    /// the delivery is a silent drop.
    pub fn resolve_tool_result(
        &mut self,
        call_id: &str,
        result: Option<String>,
        error: Option<String>,
    ) -> bool {
        self.pending_tool_calls.remove(call_id);
        match self.tool_result_resolvers.remove(call_id) {
            Some(tx) => tx.send((result, error)).is_ok(),
            None => false,
        }
    }

    /// Cancel and remove a resolver without firing it (used when the wait
    /// times out on its own timer — the timer delivers the synthetic
    /// resolution directly, it doesn't go through this map).
    pub fn drop_resolver(&mut self, call_id: &str) {
        self.tool_result_resolvers.remove(call_id);
    }

    /// Fail every outstanding resolver, used on explicit session eviction
    /// so no suspended conductor loop leaks.
    pub fn fail_all_pending(&mut self, reason: &str) -> usize {
        let resolvers = std::mem::take(&mut self.tool_result_resolvers);
        let count = resolvers.len();
        for (_, tx) in resolvers {
            let _ = tx.send((None, Some(reason.to_string())));
        }
        self.pending_tool_calls.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_domain::tool::ToolCallRequest;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest {
            id: id.into(),
            name: "repositories.list".into(),
            input: serde_json::json!({}),
        }
    }

    #[test]
    fn truncation_keeps_cap() {
        let mut s = Session::new("s1", 2);
        for i in 0..10 {
            s.append_turn(Turn::user(format!("u{i}")));
            s.append_turn(Turn::assistant_text(format!("a{i}")));
        }
        assert!(s.history.len() <= 4);
    }

    #[test]
    fn truncation_never_orphans_a_tool_turn() {
        let mut s = Session::new("s1", 1);
        s.append_turn(Turn::system("directive"));
        s.append_turn(Turn::user("list my repos"));
        s.append_turn(Turn::assistant_tool_calls(vec![call("tu_1")]));
        s.append_turn(Turn::tool("tu_1", "repositories.list", "{}"));
        s.append_turn(Turn::assistant_text("you have 3 repos"));
        s.append_turn(Turn::user("thanks"));
        s.append_turn(Turn::assistant_text("anytime"));

        for turn in &s.history {
            if let Turn::Tool { tool_use_id, .. } = turn {
                let has_parent = s.history.iter().any(|t| match t {
                    Turn::AssistantToolCalls { calls } => calls.iter().any(|c| &c.id == tool_use_id),
                    _ => false,
                });
                assert!(has_parent, "orphaned tool turn for {tool_use_id}");
            }
        }
        assert!(matches!(s.history.first(), Some(Turn::System { .. })));
    }

    #[test]
    fn resolve_tool_result_fires_registered_resolver() {
        let mut s = Session::new("s1", 20);
        s.register_pending("c1", "agent.spawn");
        let (tx, rx) = oneshot::channel();
        s.register_resolver("c1", tx);

        let fired = s.resolve_tool_result("c1", Some("{\"ok\":true}".into()), None);
        assert!(fired);
        assert!(!s.pending_tool_calls.contains_key("c1"));
        assert_eq!(rx.try_recv().unwrap(), (Some("{\"ok\":true}".into()), None));
    }

    #[test]
    fn resolve_tool_result_unknown_call_is_silent_drop() {
        let mut s = Session::new("s1", 20);
        let fired = s.resolve_tool_result("unknown", Some("x".into()), None);
        assert!(!fired);
    }

    #[test]
    fn fail_all_pending_clears_and_notifies() {
        let mut s = Session::new("s1", 20);
        s.register_pending("c1", "agent.spawn");
        let (tx, rx) = oneshot::channel();
        s.register_resolver("c1", tx);

        let n = s.fail_all_pending("session_evicted");
        assert_eq!(n, 1);
        assert!(s.pending_tool_calls.is_empty());
        assert_eq!(rx.try_recv().unwrap().1.as_deref(), Some("session_evicted"));
    }

    #[test]
    fn trace_ring_bounded_to_24() {
        let mut s = Session::new("s1", 20);
        for i in 0..30 {
            s.record_trace(format!("step{i}"));
        }
        assert_eq!(s.recent_transcript_trace.len(), 24);
        assert_eq!(s.recent_transcript_trace.front().unwrap(), "step6");
    }
}
