//! A scripted driver for tests and demos.
//!
//! The mock records every control call and lets tests inject events as
//! if the device network produced them. The on/off and level helpers map
//! to class 37 and class 38 value writes, matching common binary-switch
//! and multilevel-switch devices.

use crate::control::{DeviceControl, DriverError};
use crate::events::DriverEvent;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use zmirror_core::{NodeId, ValueId};

const CLASS_BINARY_SWITCH: u16 = 37;
const CLASS_MULTILEVEL_SWITCH: u16 = 38;

/// One recorded control invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCall {
    /// `connect(device)`
    Connect(String),
    /// `disconnect(device)`
    Disconnect(String),
    /// Any value write, including those derived from on/off/level.
    SetValue(ValueId, serde_json::Value),
    /// `set_node_location(node_id, location)`
    SetNodeLocation(NodeId, String),
    /// `set_node_name(node_id, name)`
    SetNodeName(NodeId, String),
}

/// Injects events into the mock's event stream.
#[derive(Debug, Clone)]
pub struct EventInjector {
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl EventInjector {
    /// Push an event as if the device network produced it.
    pub fn emit(&self, event: DriverEvent) {
        // Receiver dropped means the consumer shut down; nothing to do.
        let _ = self.tx.send(event);
    }
}

/// A driver that records control calls and replays injected events.
#[derive(Debug, Clone)]
pub struct MockDriver {
    calls: Arc<Mutex<Vec<ControlCall>>>,
    tx: mpsc::UnboundedSender<DriverEvent>,
}

impl MockDriver {
    /// Create a mock driver and the receiving end of its event stream.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DriverEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                tx,
            },
            rx,
        )
    }

    /// A handle for injecting events from tests.
    #[must_use]
    pub fn injector(&self) -> EventInjector {
        EventInjector {
            tx: self.tx.clone(),
        }
    }

    /// Snapshot of all recorded control calls, in invocation order.
    ///
    /// # Panics
    ///
    /// Panics if a previous holder of the call log panicked.
    #[must_use]
    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ControlCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl DeviceControl for MockDriver {
    fn connect(&mut self, device: &str) -> Result<(), DriverError> {
        self.record(ControlCall::Connect(device.to_string()));
        Ok(())
    }

    fn disconnect(&mut self, device: &str) -> Result<(), DriverError> {
        self.record(ControlCall::Disconnect(device.to_string()));
        Ok(())
    }

    fn set_value(&mut self, id: &ValueId, value: &serde_json::Value) -> Result<(), DriverError> {
        self.record(ControlCall::SetValue(*id, value.clone()));
        Ok(())
    }

    fn set_node_on(&mut self, node_id: NodeId) -> Result<(), DriverError> {
        self.set_value(&ValueId::new(node_id, CLASS_BINARY_SWITCH, 1, 0), &json!(1))
    }

    fn set_node_off(&mut self, node_id: NodeId) -> Result<(), DriverError> {
        self.set_value(&ValueId::new(node_id, CLASS_BINARY_SWITCH, 1, 0), &json!(0))
    }

    fn set_level(&mut self, node_id: NodeId, level: u8) -> Result<(), DriverError> {
        self.set_value(
            &ValueId::new(node_id, CLASS_MULTILEVEL_SWITCH, 1, 0),
            &json!(level),
        )
    }

    fn set_node_location(&mut self, node_id: NodeId, location: &str) -> Result<(), DriverError> {
        self.record(ControlCall::SetNodeLocation(node_id, location.to_string()));
        Ok(())
    }

    fn set_node_name(&mut self, node_id: NodeId, name: &str) -> Result<(), DriverError> {
        self.record(ControlCall::SetNodeName(node_id, name.to_string()));
        Ok(())
    }
}
