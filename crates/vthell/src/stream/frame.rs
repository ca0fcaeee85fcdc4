//! Wire frame codec for the event stream.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names carried on the stream.
pub mod events {
    /// Synthetic, dispatched locally after the transport opens.
    pub const CONNECT: &str = "connect";
    /// Synthetic, dispatched locally after the transport drops.
    pub const CLOSED: &str = "closed";
    /// Server liveness probe; answered with [`PONG`], never forwarded.
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
    /// Full job snapshot sent right after connecting.
    pub const JOB_INIT: &str = "connect_job_init";
    pub const JOB_UPDATE: &str = "job_update";
    pub const JOB_SCHEDULED: &str = "job_scheduled";
    pub const JOB_DELETE: &str = "job_delete";
}

/// One `{event, data}` frame, symmetric in both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Binary frames carry the same JSON text.
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_text_frame() {
        let frame = Frame::decode(r#"{"event": "job_delete", "data": {"id": "v1"}}"#).unwrap();
        assert_eq!(frame.event, events::JOB_DELETE);
        assert_eq!(frame.data, json!({"id": "v1"}));
    }

    #[test]
    fn test_decode_missing_data_defaults_to_null() {
        let frame = Frame::decode(r#"{"event": "closed"}"#).unwrap();
        assert_eq!(frame.data, Value::Null);
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(Frame::decode("{not json").is_err());
        assert!(Frame::decode(r#"{"data": 1}"#).is_err());
    }

    #[test]
    fn test_encode_shape() {
        let frame = Frame::new(events::PONG, json!({"t": 12}));
        let encoded = frame.encode().unwrap();
        let back = Frame::decode(&encoded).unwrap();
        assert_eq!(back, frame);
    }
}
