//! # zmirror Protocol
//!
//! Wire protocol for the mirror topics and the command channel.
//!
//! ## Topics
//!
//! - `<prefix>/node<id>` — node metadata, retained, JSON or empty
//! - `<prefix>/node<id>/value<class>-<instance>-<index>` — value record,
//!   retained, JSON or empty
//! - `<prefix>/node<id>/event` and `<prefix>/node<id>/scene` — transient
//!   events, not retained
//! - `<prefix>/set` — command input, JSON object or array
//!
//! An empty payload is the reserved sentinel for "this entity no longer
//! exists" on the retained topics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod payload;
pub mod topics;

pub use command::{decode_commands, encode_batch, encode_command, Command, CommandError};
pub use payload::{decode_state, encode_state, PayloadError, StateMessage, REMOVED_SENTINEL};
pub use topics::{StateTopic, TopicScheme};
