//! Builders for wire payloads used across integration tests.

use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

/// A full job payload as the backend sends it.
pub fn job_value(id: &str, start_time: i64, status: &str) -> Value {
    json!({
        "id": id,
        "title": format!("Stream {}", id),
        "filename": format!("{}.mkv", id),
        "start_time": start_time,
        "channel_id": "UCtestchannel",
        "is_member": false,
        "status": status,
        "resolution": null,
        "error": null,
    })
}

/// A text frame in the `{event, data}` wire shape.
pub fn text_frame(event: &str, data: Value) -> Message {
    Message::Text(json!({ "event": event, "data": data }).to_string())
}
