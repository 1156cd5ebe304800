//! The in-memory mirror of node metadata and per-node value lists.
//!
//! Every value observation is classified into exactly one of three
//! outcomes: added (key unseen), changed (at least one observed field
//! differs by deep equality), or refreshed (all observed fields equal).
//! The classification drives downstream propagation: changed records are
//! republished or re-emitted, refreshed ones must not be.
//!
//! The store exclusively owns its records; callers receive read-only
//! views or copies, never a mutable alias.

use crate::model::{NodeId, NodeInfo, Value, ValueId};
use serde_json::{Map, Value as Json};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// One field-level difference discovered during a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Name of the differing field.
    pub field: String,
    /// Previously stored value (`null` if the field was absent).
    pub old: Json,
    /// Newly observed value.
    pub cur: Json,
}

/// Classification of a value merge.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueMergeKind {
    /// The composite key was not previously present.
    Added,
    /// At least one observed field differed; carries the full change list.
    Changed(Vec<FieldChange>),
    /// Every observed field deep-equals the stored record; nothing mutated.
    Refreshed,
}

/// Result of merging a value observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueMerge {
    /// How the observation classified.
    pub kind: ValueMergeKind,
    /// Whether the owning node record was created as a side effect.
    pub node_created: bool,
}

/// Result of merging a node observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeMerge {
    /// Whether the node record was created by this merge.
    pub created: bool,
    /// True exactly the first time the ready flag flips to true.
    pub became_ready: bool,
}

/// A node removed from the store, with all of its values.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    /// Final node metadata.
    pub info: NodeInfo,
    /// All values owned by the node at removal time.
    pub values: Vec<Value>,
}

/// Errors raised by store merges.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A record failed to round-trip through its JSON representation.
    #[error("record codec error: {0}")]
    Codec(String),
}

#[derive(Debug, Clone, Default)]
struct NodeEntry {
    info: NodeInfo,
    values: BTreeMap<String, Value>,
}

/// The authoritative local mirror for one side of the bridge.
#[derive(Debug, Clone, Default)]
pub struct Store {
    nodes: BTreeMap<NodeId, NodeEntry>,
}

impl Store {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a value observation, classifying it as added, changed, or
    /// refreshed.
    ///
    /// Fields absent from the observation are left untouched; the node
    /// record is created implicitly if the owning node was unknown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] if a record fails to round-trip
    /// through JSON during the field-level diff.
    pub fn merge_value(&mut self, observed: Value) -> Result<ValueMerge, StoreError> {
        let id = observed.id();
        let node_created = !self.nodes.contains_key(&id.node_id);
        let entry = self.nodes.entry(id.node_id).or_default();

        match entry.values.entry(id.key()) {
            Entry::Vacant(slot) => {
                let mut record = observed;
                record.value_id.get_or_insert_with(|| id.key());
                slot.insert(record);
                Ok(ValueMerge {
                    kind: ValueMergeKind::Added,
                    node_created,
                })
            }
            Entry::Occupied(mut slot) => {
                let mut stored_map = to_map(slot.get())?;
                let observed_map = to_map(&observed)?;

                let mut changes = Vec::new();
                for (field, cur) in observed_map {
                    let old = stored_map.get(&field);
                    if old != Some(&cur) {
                        changes.push(FieldChange {
                            field: field.clone(),
                            old: old.cloned().unwrap_or(Json::Null),
                            cur: cur.clone(),
                        });
                        stored_map.insert(field, cur);
                    }
                }

                if changes.is_empty() {
                    Ok(ValueMerge {
                        kind: ValueMergeKind::Refreshed,
                        node_created,
                    })
                } else {
                    *slot.get_mut() = from_map(stored_map)?;
                    Ok(ValueMerge {
                        kind: ValueMergeKind::Changed(changes),
                        node_created,
                    })
                }
            }
        }
    }

    /// Merge node metadata with per-field last-write-wins semantics.
    ///
    /// Only observed fields overwrite; the ready flag is monotone and
    /// `became_ready` fires exactly once, on the transition into ready.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Codec`] if a record fails to round-trip
    /// through JSON.
    pub fn merge_node(&mut self, node_id: NodeId, info: &NodeInfo) -> Result<NodeMerge, StoreError> {
        let created = !self.nodes.contains_key(&node_id);
        let entry = self.nodes.entry(node_id).or_default();
        let was_ready = entry.info.ready;

        // `ready: false` is skipped during serialization, so the flag only
        // ever appears in the observed map when true and never regresses.
        let mut merged = to_map(&entry.info)?;
        for (field, value) in to_map(info)? {
            merged.insert(field, value);
        }
        entry.info = from_map(merged)?;

        Ok(NodeMerge {
            created,
            became_ready: !was_ready && entry.info.ready,
        })
    }

    /// Remove a node and all of its values atomically.
    ///
    /// Returns the removed records so the caller can publish removal
    /// sentinels for each of them.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<RemovedNode> {
        self.nodes.remove(&node_id).map(|entry| RemovedNode {
            info: entry.info,
            values: entry.values.into_values().collect(),
        })
    }

    /// Remove a single value, returning the stored record if it existed.
    pub fn remove_value(&mut self, id: &ValueId) -> Option<Value> {
        self.nodes
            .get_mut(&id.node_id)
            .and_then(|entry| entry.values.remove(&id.key()))
    }

    /// Metadata for a node, if known.
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&NodeInfo> {
        self.nodes.get(node_id).map(|entry| &entry.info)
    }

    /// A single value record, if known.
    #[must_use]
    pub fn value(&self, id: &ValueId) -> Option<&Value> {
        self.nodes
            .get(&id.node_id)
            .and_then(|entry| entry.values.get(&id.key()))
    }

    /// All values of a node, in key order.
    pub fn values_of(&self, node_id: NodeId) -> impl Iterator<Item = &Value> {
        self.nodes
            .get(&node_id)
            .into_iter()
            .flat_map(|entry| entry.values.values())
    }

    /// Derived string keys of a node's values, in key order.
    #[must_use]
    pub fn value_keys_of(&self, node_id: NodeId) -> Vec<String> {
        self.nodes
            .get(&node_id)
            .map(|entry| entry.values.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// All known node ids, ascending.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of known nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

fn to_map<T: serde::Serialize>(record: &T) -> Result<Map<String, Json>, StoreError> {
    match serde_json::to_value(record).map_err(|e| StoreError::Codec(e.to_string()))? {
        Json::Object(map) => Ok(map),
        other => Err(StoreError::Codec(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn from_map<T: serde::de::DeserializeOwned>(map: Map<String, Json>) -> Result<T, StoreError> {
    serde_json::from_value(Json::Object(map)).map_err(|e| StoreError::Codec(e.to_string()))
}
