//! The write capability set of a device-network driver.

use zmirror_core::{NodeId, ValueId};

/// Errors surfaced by driver write operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriverError {
    /// The underlying transport refused or dropped the operation.
    #[error("driver transport error: {0}")]
    Transport(String),
    /// The command cannot be expressed for the targeted entity.
    #[error("unsupported driver operation: {0}")]
    Unsupported(String),
}

/// Write operations the gateway dispatches decoded commands to.
///
/// Implementations are fire-and-forget: success means the operation was
/// accepted for delivery, and the resulting state change surfaces later
/// as a driver event.
pub trait DeviceControl: Send {
    /// Attach to the device network identified by `device`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the driver cannot start attaching.
    fn connect(&mut self, device: &str) -> Result<(), DriverError>;

    /// Detach from the device network.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the detach cannot be initiated.
    fn disconnect(&mut self, device: &str) -> Result<(), DriverError>;

    /// Write a scalar to the value addressed by its composite key.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the write is not accepted.
    fn set_value(&mut self, id: &ValueId, value: &serde_json::Value) -> Result<(), DriverError>;

    /// Turn a node's binary switch on.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the write is not accepted.
    fn set_node_on(&mut self, node_id: NodeId) -> Result<(), DriverError>;

    /// Turn a node's binary switch off.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the write is not accepted.
    fn set_node_off(&mut self, node_id: NodeId) -> Result<(), DriverError>;

    /// Set a node's multilevel value, e.g. a dimmer percentage.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the write is not accepted.
    fn set_level(&mut self, node_id: NodeId, level: u8) -> Result<(), DriverError>;

    /// Set a node's location string.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the write is not accepted.
    fn set_node_location(&mut self, node_id: NodeId, location: &str) -> Result<(), DriverError>;

    /// Set a node's name.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] if the write is not accepted.
    fn set_node_name(&mut self, node_id: NodeId, name: &str) -> Result<(), DriverError>;
}
