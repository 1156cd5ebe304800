//! # zmirror Core
//!
//! Identity model and state store for the zmirror bridge.
//!
//! This crate provides:
//! - Canonical identifiers for nodes and values (`NodeId`, `ValueId`)
//! - Wire-compatible `Value` and `NodeInfo` records
//! - The diff/merge `Store` that classifies every value observation as
//!   added, changed, or refreshed

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod model;
pub mod store;

pub use model::{ClassId, HomeId, Index, Instance, NodeId, NodeInfo, SceneId, Value, ValueId};
pub use store::{FieldChange, NodeMerge, RemovedNode, Store, StoreError, ValueMerge, ValueMergeKind};
