//! # zmirror Remote Adapter
//!
//! Reconstructs a device-network driver facade from a gateway's retained
//! mirror topics.
//!
//! The adapter subscribes to `<prefix>/#`, merges every mirror message
//! into a local store, and synthesizes the driver events an application
//! would have seen against the real driver. Writes go the other way:
//! the [`RemoteControl`] handle encodes commands onto the shared
//! `<prefix>/set` topic, where the gateway dispatches them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod broker;
pub mod mirror;
pub mod ready;

pub use adapter::{RemoteAdapter, RemoteConfig, RemoteControl, RemoteError};
pub use broker::{parse_broker_url, BrokerUrlError};
pub use mirror::{Mirror, ReadyAction};
pub use ready::{ReadyTimers, DEFAULT_READY_DELAY};
