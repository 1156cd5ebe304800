//! Canonical identifiers and record types for the device network.
//!
//! `Value` and `NodeInfo` serialize to the exact JSON shape used on the
//! mirror topics. Optional fields are skipped when absent so a merge can
//! distinguish "not observed" from "observed as null"; unknown attributes
//! are preserved in a flattened side-map for forward wire compatibility.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a whole device network.
pub type HomeId = u32;
/// Identifier of a single addressable device on the network.
pub type NodeId = u16;
/// Semantic class of a value (e.g. binary switch, multilevel).
pub type ClassId = u16;
/// Disambiguates multiple endpoints of the same class on one node.
pub type Instance = u16;
/// Disambiguates multiple values within one class/instance.
pub type Index = u16;
/// Identifier of a scene activation event.
pub type SceneId = u8;

/// Composite key identifying one value on the device network.
///
/// Stable for the value's lifetime; two values with different composite
/// keys never share a derived string key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId {
    /// Owning node.
    pub node_id: NodeId,
    /// Semantic class.
    pub class_id: ClassId,
    /// Endpoint instance.
    pub instance: Instance,
    /// Value index within the class/instance.
    pub index: Index,
}

impl ValueId {
    /// Create a new composite key.
    #[must_use]
    pub fn new(node_id: NodeId, class_id: ClassId, instance: Instance, index: Index) -> Self {
        Self {
            node_id,
            class_id,
            instance,
            index,
        }
    }

    /// Stable string serialization of the composite key, used as a map key.
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.node_id, self.class_id, self.instance, self.index
        )
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.node_id, self.class_id, self.instance, self.index
        )
    }
}

/// One controllable/observable property of a node.
///
/// The composite-key fields are required; everything else is descriptive
/// metadata plus the current scalar `value` (string, number, or boolean).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Value {
    /// Owning node.
    pub node_id: NodeId,
    /// Semantic class.
    pub class_id: ClassId,
    /// Endpoint instance.
    pub instance: Instance,
    /// Value index within the class/instance.
    pub index: Index,
    /// Derived string key (filled in by the store on first observation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_id: Option<String>,
    /// Value data type name (e.g. "bool", "byte", "decimal").
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Value genre (e.g. "user", "config", "system").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Help text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Value cannot be written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    /// Value cannot be read back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    /// Minimum allowed value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Maximum allowed value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Whether the driver polls this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_polled: Option<bool>,
    /// Current scalar value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Unknown attributes, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Value {
    /// The composite key of this value.
    #[must_use]
    pub fn id(&self) -> ValueId {
        ValueId::new(self.node_id, self.class_id, self.instance, self.index)
    }
}

/// Descriptive metadata for a node.
///
/// Readiness is monotone: unknown, then known (possibly partial), then
/// ready. A node never regresses from ready except via removal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Manufacturer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// Manufacturer identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturerid: Option<String>,
    /// Product name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// Product type identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producttype: Option<String>,
    /// Product identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub productid: Option<String>,
    /// Device type label.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// User-assigned name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// User-assigned location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
    /// Whether the node has completed its queries and is ready for use.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ready: bool,
    /// Keys of the node's known values, published once the node is ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    /// Unknown attributes, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(flag: &bool) -> bool {
    !*flag
}
