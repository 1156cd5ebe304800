//! Topic scheme for the mirror and command channels.
//!
//! Topic structure: `<prefix>/node<id>[/value<class>-<instance>-<index>]`
//! plus the transient `/event` and `/scene` sub-topics and the shared
//! `<prefix>/set` command topic.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use zmirror_core::{NodeId, ValueId};

/// Topic scheme configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicScheme {
    /// Topic prefix, unique per gateway instance on the same broker.
    pub prefix: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self {
            prefix: "zwave".to_string(),
        }
    }
}

/// A state-mirroring topic, decoded from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTopic {
    /// Node metadata topic.
    Node(NodeId),
    /// Value record topic.
    Value(ValueId),
}

impl TopicScheme {
    /// Create a new topic scheme with the given prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Topic mirroring a node's metadata (retained).
    #[must_use]
    pub fn node(&self, node_id: NodeId) -> String {
        format!("{}/node{node_id}", self.prefix)
    }

    /// Topic mirroring a single value record (retained).
    #[must_use]
    pub fn value(&self, id: &ValueId) -> String {
        format!(
            "{}/node{}/value{}-{}-{}",
            self.prefix, id.node_id, id.class_id, id.instance, id.index
        )
    }

    /// Topic for transient node events (not retained).
    #[must_use]
    pub fn node_event(&self, node_id: NodeId) -> String {
        format!("{}/node{node_id}/event", self.prefix)
    }

    /// Topic for transient scene events (not retained).
    #[must_use]
    pub fn node_scene(&self, node_id: NodeId) -> String {
        format!("{}/node{node_id}/scene", self.prefix)
    }

    /// The command input topic.
    #[must_use]
    pub fn set(&self) -> String {
        format!("{}/set", self.prefix)
    }

    /// Wildcard subscription covering every topic under the prefix.
    #[must_use]
    pub fn wildcard(&self) -> String {
        format!("{}/#", self.prefix)
    }

    /// Parse a full topic into a state topic.
    ///
    /// Exactly two shapes are recognized: `node<id>` and
    /// `node<id>/value<class>-<instance>-<index>`. Anything else —
    /// including unknown sub-topics — yields `None` so the scheme stays
    /// forward compatible.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<StateTopic> {
        let rest = topic.strip_prefix(&self.prefix)?.strip_prefix('/')?;
        parse_relative(rest)
    }
}

/// Parse a prefix-stripped topic path into a state topic.
#[must_use]
pub fn parse_relative(path: &str) -> Option<StateTopic> {
    let rest = path.strip_prefix("node")?;
    match rest.split_once('/') {
        None => Some(StateTopic::Node(parse_segment(rest)?)),
        Some((node, tail)) => {
            let node_id = parse_segment(node)?;
            let composite = tail.strip_prefix("value")?;
            if composite.contains('/') {
                return None;
            }
            let mut parts = composite.split('-');
            let class_id = parse_segment(parts.next()?)?;
            let instance = parse_segment(parts.next()?)?;
            let index = parse_segment(parts.next()?)?;
            if parts.next().is_some() {
                return None;
            }
            Some(StateTopic::Value(ValueId::new(
                node_id, class_id, instance, index,
            )))
        }
    }
}

/// Parse one numeric topic segment: pure ASCII digits, in range for the
/// target integer type. Sign prefixes and empty segments are rejected.
fn parse_segment<T: FromStr>(segment: &str) -> Option<T> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
