//! Command channel wire format.
//!
//! A write intent is a tagged union discriminated by `cmd`; a command
//! message is either a single command object or an ordered array of
//! them. Array elements decode independently so one bad element never
//! blocks dispatch of the rest.

use serde::{Deserialize, Serialize};
use zmirror_core::{ClassId, Index, Instance, NodeId, ValueId};

/// A single write command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum Command {
    /// Write an arbitrary value, addressed by its composite key.
    #[serde(rename_all = "camelCase")]
    Value {
        /// Owning node.
        node_id: NodeId,
        /// Semantic class.
        class_id: ClassId,
        /// Endpoint instance.
        instance: Instance,
        /// Value index.
        index: Index,
        /// Scalar to write (string, number, or boolean).
        value: serde_json::Value,
    },
    /// Turn a binary switch on.
    #[serde(rename_all = "camelCase")]
    On {
        /// Target node.
        node_id: NodeId,
    },
    /// Turn a binary switch off.
    #[serde(rename_all = "camelCase")]
    Off {
        /// Target node.
        node_id: NodeId,
    },
    /// Set a level, e.g. dimming of lights.
    #[serde(rename_all = "camelCase")]
    Level {
        /// Target node.
        node_id: NodeId,
        /// Level percentage.
        value: u8,
    },
    /// Set the node's location string.
    #[serde(rename_all = "camelCase")]
    Location {
        /// Target node.
        node_id: NodeId,
        /// New location.
        value: String,
    },
    /// Set the node's name.
    #[serde(rename_all = "camelCase")]
    Name {
        /// Target node.
        node_id: NodeId,
        /// New name.
        value: String,
    },
}

impl Command {
    /// Build a value write addressed by composite key.
    #[must_use]
    pub fn value(id: &ValueId, value: serde_json::Value) -> Self {
        Self::Value {
            node_id: id.node_id,
            class_id: id.class_id,
            instance: id.instance,
            index: id.index,
            value,
        }
    }

    /// The node a command targets.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        match self {
            Self::Value { node_id, .. }
            | Self::On { node_id }
            | Self::Off { node_id }
            | Self::Level { node_id, .. }
            | Self::Location { node_id, .. }
            | Self::Name { node_id, .. } => *node_id,
        }
    }
}

/// Errors for command encoding/decoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandError {
    /// Serialization failed.
    #[error("command encode error: {0}")]
    Encode(String),
    /// The payload, or one element of it, was not a valid command.
    #[error("command decode error: {0}")]
    Decode(String),
}

/// Encode a single command for the command topic.
///
/// # Errors
///
/// Returns [`CommandError::Encode`] if serialization fails.
pub fn encode_command(command: &Command) -> Result<Vec<u8>, CommandError> {
    serde_json::to_vec(command).map_err(|e| CommandError::Encode(e.to_string()))
}

/// Encode an ordered batch of commands as a JSON array.
///
/// # Errors
///
/// Returns [`CommandError::Encode`] if serialization fails.
pub fn encode_batch(commands: &[Command]) -> Result<Vec<u8>, CommandError> {
    serde_json::to_vec(commands).map_err(|e| CommandError::Encode(e.to_string()))
}

/// Decode a command payload into per-element results, in array order.
///
/// The outer `Err` fires only when the payload is not JSON or not an
/// object/array. Each element decodes independently: an unknown `cmd`
/// tag or missing field yields an `Err` for that element only, so the
/// caller can dispatch the valid ones best-effort.
///
/// # Errors
///
/// Returns [`CommandError::Decode`] for an unparseable payload.
pub fn decode_commands(payload: &[u8]) -> Result<Vec<Result<Command, CommandError>>, CommandError> {
    let root: serde_json::Value =
        serde_json::from_slice(payload).map_err(|e| CommandError::Decode(e.to_string()))?;

    match root {
        serde_json::Value::Array(elements) => {
            Ok(elements.into_iter().map(decode_element).collect())
        }
        object @ serde_json::Value::Object(_) => Ok(vec![decode_element(object)]),
        _ => Err(CommandError::Decode(
            "command payload must be a JSON object or array".to_string(),
        )),
    }
}

fn decode_element(element: serde_json::Value) -> Result<Command, CommandError> {
    serde_json::from_value(element).map_err(|e| CommandError::Decode(e.to_string()))
}
