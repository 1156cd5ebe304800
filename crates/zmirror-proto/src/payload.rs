//! State payload encoding for the retained mirror topics.
//!
//! A present/updated entity is the JSON object of its record; a
//! zero-length body is the reserved sentinel for "removed". Decoding an
//! empty payload never attempts a JSON parse.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// The reserved removal sentinel: an empty message body.
pub const REMOVED_SENTINEL: &[u8] = b"";

/// A decoded state message.
#[derive(Debug, Clone, PartialEq)]
pub enum StateMessage<T> {
    /// The entity exists; carries its current record.
    Present(T),
    /// The entity no longer exists.
    Removed,
}

/// Errors for state payload encoding/decoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PayloadError {
    /// Serialization failed.
    #[error("payload encode error: {0}")]
    Encode(String),
    /// A non-empty payload was not valid JSON for the record type.
    #[error("payload decode error: {0}")]
    Decode(String),
}

/// Encode a record as its JSON wire form.
///
/// # Errors
///
/// Returns [`PayloadError::Encode`] if serialization fails.
pub fn encode_state<T: Serialize>(record: &T) -> Result<Vec<u8>, PayloadError> {
    serde_json::to_vec(record).map_err(|e| PayloadError::Encode(e.to_string()))
}

/// Decode a state payload, honoring the empty-body removal sentinel.
///
/// # Errors
///
/// Returns [`PayloadError::Decode`] if a non-empty payload is not valid
/// JSON for the record type. Callers log and drop such messages; a
/// malformed payload is never fatal.
pub fn decode_state<T: DeserializeOwned>(payload: &[u8]) -> Result<StateMessage<T>, PayloadError> {
    if payload.is_empty() {
        return Ok(StateMessage::Removed);
    }
    serde_json::from_slice(payload)
        .map(StateMessage::Present)
        .map_err(|e| PayloadError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zmirror_core::{NodeInfo, Value};

    #[test]
    fn value_record_roundtrip() {
        let value = Value {
            node_id: 12,
            class_id: 37,
            instance: 1,
            index: 0,
            label: Some("Switch".to_string()),
            read_only: Some(true),
            min: Some(0.0),
            value: Some(json!(1)),
            ..Value::default()
        };

        let payload = encode_state(&value).unwrap();
        let decoded = decode_state::<Value>(&payload).unwrap();

        assert_eq!(decoded, StateMessage::Present(value));
    }

    #[test]
    fn empty_payload_is_always_removed() {
        assert_eq!(
            decode_state::<Value>(REMOVED_SENTINEL).unwrap(),
            StateMessage::Removed
        );
        assert_eq!(
            decode_state::<NodeInfo>(b"").unwrap(),
            StateMessage::Removed
        );
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(decode_state::<Value>(b"{not json").is_err());
        assert!(decode_state::<NodeInfo>(b"[1,2]").is_err());
    }
}
