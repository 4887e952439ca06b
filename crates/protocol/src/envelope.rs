//! The wire envelope: `{id, type, timestamp, sessionId, payload}`.
//!
//! A size cap is enforced before JSON parsing — oversized frames are
//! rejected without ever handing attacker-controlled bytes to `serde_json`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A decoded or to-be-encoded wire envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub payload: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("frame too large: {len} bytes exceeds cap of {max}")]
    TooLarge { len: usize, max: usize },
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

impl Envelope {
    /// Mint a fresh envelope with a server-generated `id` and the current
    /// timestamp.
    pub fn make(
        event_type: impl Into<String>,
        session_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
            payload,
        }
    }

    /// Decode a wire frame, enforcing `max_bytes` before any JSON parsing.
    pub fn decode(bytes: &[u8], max_bytes: usize) -> Result<Envelope, EnvelopeError> {
        if bytes.len() > max_bytes {
            return Err(EnvelopeError::TooLarge {
                len: bytes.len(),
                max: max_bytes,
            });
        }

        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;
        let obj = value
            .as_object()
            .ok_or_else(|| EnvelopeError::InvalidEvent("payload is not a JSON object".into()))?;

        let id = required_string(obj, "id")?;
        let event_type = required_string(obj, "type")?;
        let timestamp_str = required_string(obj, "timestamp")?;
        let session_id = required_string(obj, "sessionId")?;
        let timestamp = parse_timestamp(&timestamp_str)?;

        let payload = match obj.get("payload") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(Value::Object(m)) => Value::Object(m.clone()),
            Some(_) => {
                return Err(EnvelopeError::InvalidEvent(
                    "payload must be an object".into(),
                ))
            }
        };

        Ok(Envelope {
            id,
            event_type,
            timestamp,
            session_id,
            payload,
        })
    }

    /// Serialize to wire bytes. `timestamp` is always emitted as an
    /// ISO-8601 UTC string with millisecond precision.
    pub fn encode(&self) -> Vec<u8> {
        let v = serde_json::json!({
            "id": self.id,
            "type": self.event_type,
            "timestamp": self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            "sessionId": self.session_id,
            "payload": self.payload,
        });
        serde_json::to_vec(&v).expect("envelope always serializes")
    }
}

fn required_string(obj: &Map<String, Value>, field: &str) -> Result<String, EnvelopeError> {
    match obj.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(EnvelopeError::InvalidEvent(format!(
            "field \"{field}\" must be non-empty"
        ))),
        Some(_) => Err(EnvelopeError::InvalidEvent(format!(
            "field \"{field}\" must be a string"
        ))),
        None => Err(EnvelopeError::InvalidEvent(format!(
            "missing required field \"{field}\""
        ))),
    }
}

/// Accepts both with and without fractional seconds, per the wire contract.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, EnvelopeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EnvelopeError::InvalidEvent(format!("invalid timestamp \"{s}\": {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_assigns_fresh_id_and_timestamp() {
        let env = Envelope::make("session.started", "s1", serde_json::json!({}));
        assert!(!env.id.is_empty());
        assert_eq!(env.session_id, "s1");
        assert_eq!(env.event_type, "session.started");
    }

    #[test]
    fn round_trip_decode_encode() {
        let env = Envelope::make(
            "user.audio.transcript.final",
            "s1",
            serde_json::json!({"text": "hello"}),
        );
        let bytes = env.encode();
        let decoded = Envelope::decode(&bytes, 65_536).unwrap();
        assert_eq!(decoded.id, env.id);
        assert_eq!(decoded.event_type, env.event_type);
        assert_eq!(decoded.session_id, env.session_id);
        assert_eq!(decoded.payload, env.payload);
        let delta = (decoded.timestamp - env.timestamp).num_milliseconds().abs();
        assert!(delta <= 1, "timestamp drifted by {delta}ms");
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let bytes = vec![b'x'; 100];
        let err = Envelope::decode(&bytes, 10).unwrap_err();
        assert!(matches!(err, EnvelopeError::TooLarge { .. }));
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let err = Envelope::decode(b"not json", 65_536).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidJson(_)));
    }

    #[test]
    fn decode_rejects_missing_fields() {
        let bytes = serde_json::to_vec(&serde_json::json!({"id": "x"})).unwrap();
        let err = Envelope::decode(&bytes, 65_536).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidEvent(_)));
    }

    #[test]
    fn decode_rejects_empty_string_fields() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "id": "", "type": "t", "timestamp": "2024-01-01T00:00:00Z", "sessionId": "s"
        }))
        .unwrap();
        let err = Envelope::decode(&bytes, 65_536).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidEvent(_)));
    }

    #[test]
    fn decode_accepts_timestamp_without_fractional_seconds() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "id": "e1", "type": "session.start", "timestamp": "2024-01-01T00:00:00Z",
            "sessionId": "s1"
        }))
        .unwrap();
        let decoded = Envelope::decode(&bytes, 65_536).unwrap();
        assert_eq!(decoded.id, "e1");
    }

    #[test]
    fn decode_accepts_timestamp_with_fractional_seconds() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "id": "e1", "type": "session.start", "timestamp": "2024-01-01T00:00:00.123Z",
            "sessionId": "s1"
        }))
        .unwrap();
        let decoded = Envelope::decode(&bytes, 65_536).unwrap();
        assert_eq!(decoded.id, "e1");
    }

    #[test]
    fn decode_defaults_missing_payload_to_empty_object() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "id": "e1", "type": "audio.output.interrupted", "timestamp": "2024-01-01T00:00:00Z",
            "sessionId": "s1"
        }))
        .unwrap();
        let decoded = Envelope::decode(&bytes, 65_536).unwrap();
        assert_eq!(decoded.payload, serde_json::json!({}));
    }

    #[test]
    fn decode_rejects_non_object_payload() {
        let bytes = serde_json::to_vec(&serde_json::json!({
            "id": "e1", "type": "t", "timestamp": "2024-01-01T00:00:00Z",
            "sessionId": "s1", "payload": "not an object"
        }))
        .unwrap();
        let err = Envelope::decode(&bytes, 65_536).unwrap_err();
        assert!(matches!(err, EnvelopeError::InvalidEvent(_)));
    }
}
