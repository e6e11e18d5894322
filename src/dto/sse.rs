use serde::Serialize;

/// Event name carried by every document snapshot on the session stream.
pub const EVENT_SESSION_SNAPSHOT: &str = "session.snapshot";

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized data field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}
