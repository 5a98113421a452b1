//! # Event Decoder
//!
//! Turns raw event records into [`Event`]s.
//!
//! A record is a JSON object with a required string field `event`:
//!
//! | `event`      | Event        | Required fields      |
//! |--------------|--------------|----------------------|
//! | `add_node`   | `CreateNode` | none                 |
//! | `transition` | `Connect`    | `source`, `target`   |
//!
//! Decoding never touches a graph; it only validates shape.

use crate::{DecodeError, Event, NodeId, RawRecord};
use serde_json::Value;

/// Event kind that creates a node.
pub const KIND_ADD_NODE: &str = "add_node";

/// Event kind that links two existing nodes.
pub const KIND_TRANSITION: &str = "transition";

/// Stateless record decoder.
pub struct EventDecoder;

impl EventDecoder {
    /// Decode one parsed JSON record.
    pub fn decode(record: &Value) -> Result<Event, DecodeError> {
        let Value::Object(fields) = record else {
            return Err(DecodeError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(record)
            )));
        };

        let kind = fields
            .get("event")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingField("event"))?;

        match kind {
            KIND_ADD_NODE => Ok(Event::CreateNode {
                requested_id: fields.get("id").and_then(Value::as_str).map(str::to_string),
            }),
            KIND_TRANSITION => {
                let source = fields
                    .get("source")
                    .and_then(Value::as_str)
                    .ok_or(DecodeError::MissingField("source"))?;
                let target = fields
                    .get("target")
                    .and_then(Value::as_str)
                    .ok_or(DecodeError::MissingField("target"))?;
                Ok(Event::Connect {
                    source: NodeId::new(source),
                    target: NodeId::new(target),
                })
            }
            other => Err(DecodeError::UnknownKind(other.to_string())),
        }
    }

    /// Parse one JSON text (e.g. a log line) and decode it.
    pub fn decode_line(line: &[u8]) -> Result<Event, DecodeError> {
        let value: Value =
            serde_json::from_slice(line).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        Self::decode(&value)
    }

    /// Decode a buffered record, whichever form it arrived in.
    pub fn decode_raw(record: &RawRecord) -> Result<Event, DecodeError> {
        match record {
            RawRecord::Json(value) => Self::decode(value),
            RawRecord::Text(text) => Self::decode_line(text.as_bytes()),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_node_decodes_without_id() {
        let event = EventDecoder::decode(&json!({"event": "add_node"})).expect("decode");
        assert_eq!(event, Event::CreateNode { requested_id: None });
    }

    #[test]
    fn add_node_keeps_requested_id() {
        let event =
            EventDecoder::decode(&json!({"event": "add_node", "id": "N1"})).expect("decode");
        assert_eq!(
            event,
            Event::CreateNode {
                requested_id: Some("N1".to_string())
            }
        );
    }

    #[test]
    fn transition_decodes_endpoints() {
        let event = EventDecoder::decode(
            &json!({"event": "transition", "source": "N2", "target": "N3"}),
        )
        .expect("decode");
        assert_eq!(
            event,
            Event::Connect {
                source: NodeId::new("N2"),
                target: NodeId::new("N3"),
            }
        );
    }

    #[test]
    fn transition_without_target_is_missing_field() {
        let err = EventDecoder::decode(&json!({"event": "transition", "source": "N2"}))
            .expect_err("should fail");
        assert_eq!(err, DecodeError::MissingField("target"));
    }

    #[test]
    fn non_string_endpoint_is_missing_field() {
        let err = EventDecoder::decode(&json!({"event": "transition", "source": 2, "target": "N3"}))
            .expect_err("should fail");
        assert_eq!(err, DecodeError::MissingField("source"));
    }

    #[test]
    fn unknown_kind_is_reported() {
        let err = EventDecoder::decode(&json!({"event": "unknown_event"})).expect_err("fail");
        assert_eq!(err, DecodeError::UnknownKind("unknown_event".to_string()));
    }

    #[test]
    fn missing_event_field() {
        let err = EventDecoder::decode(&json!({"source": "N2"})).expect_err("fail");
        assert_eq!(err, DecodeError::MissingField("event"));
    }

    #[test]
    fn non_object_is_malformed() {
        let err = EventDecoder::decode(&json!(["add_node"])).expect_err("fail");
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn decode_line_parses_json_text() {
        let event = EventDecoder::decode_line(br#"{"event":"add_node"}"#).expect("decode");
        assert!(matches!(event, Event::CreateNode { .. }));
    }

    #[test]
    fn decode_line_rejects_invalid_json() {
        let err = EventDecoder::decode_line(b"{not json").expect_err("fail");
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn decode_raw_handles_both_forms() {
        let text = RawRecord::from(r#"{"event":"add_node"}"#);
        let json = RawRecord::from(json!({"event": "add_node"}));
        assert_eq!(
            EventDecoder::decode_raw(&text).expect("text"),
            EventDecoder::decode_raw(&json).expect("json")
        );
    }
}
