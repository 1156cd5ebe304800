//! Synchronization core turning retained mirror messages back into
//! driver events.
//!
//! The mirror consumes decoded topic/payload pairs, merges them into a
//! local store, and synthesizes the event a real driver would have
//! emitted for the same observation. Readiness is deferred: a node's
//! ready transition schedules a timer, and only a fired timer that still
//! finds the node present and ready produces a `"node ready"` event.

use zmirror_core::{NodeId, Store, Value, ValueId, ValueMergeKind};
use zmirror_driver::{DriverEvent, EventBus, EventKind, EventNameError};
use zmirror_proto::{decode_state, StateMessage, StateTopic, TopicScheme};

/// A timer instruction returned from message handling.
///
/// The mirror owns no timers itself; the caller runs them and feeds
/// expiries back through [`Mirror::fire_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyAction {
    /// Start (or restart) the node's ready timer.
    Schedule(NodeId),
    /// Abort the node's ready timer if one is pending.
    Cancel(NodeId),
}

/// Reconstructs driver state and events from mirror messages.
pub struct Mirror {
    topics: TopicScheme,
    store: Store,
    bus: EventBus,
}

impl Mirror {
    /// Create an empty mirror for the given topic scheme.
    #[must_use]
    pub fn new(topics: TopicScheme) -> Self {
        Self {
            topics,
            store: Store::new(),
            bus: EventBus::new(),
        }
    }

    /// The reconstructed store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Register an event callback by kind.
    pub fn on<F>(&mut self, kind: EventKind, callback: F)
    where
        F: FnMut(&DriverEvent) + Send + 'static,
    {
        self.bus.subscribe(kind, callback);
    }

    /// Register an event callback by name, e.g. `"value changed"`.
    ///
    /// # Errors
    ///
    /// Returns [`EventNameError`] for unrecognized event names.
    pub fn on_named<F>(&mut self, name: &str, callback: F) -> Result<(), EventNameError>
    where
        F: FnMut(&DriverEvent) + Send + 'static,
    {
        self.bus.subscribe_named(name, callback)
    }

    /// Ingest one mirror message.
    ///
    /// Unknown topics and malformed payloads are logged and dropped;
    /// they never fail the caller. Returns a timer instruction when the
    /// message affects a node's deferred readiness.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) -> Option<ReadyAction> {
        match self.topics.parse(topic)? {
            StateTopic::Node(node_id) => self.handle_node(node_id, payload),
            StateTopic::Value(id) => {
                self.handle_value(id, payload);
                None
            }
        }
    }

    fn handle_node(&mut self, node_id: NodeId, payload: &[u8]) -> Option<ReadyAction> {
        let message = match decode_state(payload) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(node_id, %error, "Dropping malformed node payload");
                return None;
            }
        };

        match message {
            StateMessage::Present(info) => {
                let merge = match self.store.merge_node(node_id, &info) {
                    Ok(merge) => merge,
                    Err(error) => {
                        tracing::debug!(node_id, %error, "Dropping unmergeable node record");
                        return None;
                    }
                };

                if merge.created {
                    self.bus.emit(&DriverEvent::NodeAdded(node_id));
                }
                if info.name.is_some() || info.loc.is_some() {
                    let merged = self.store.node(&node_id)?.clone();
                    self.bus.emit(&DriverEvent::NodeNaming(node_id, merged));
                }
                merge.became_ready.then_some(ReadyAction::Schedule(node_id))
            }
            StateMessage::Removed => {
                let removed = self.store.remove_node(node_id)?;
                tracing::debug!(
                    node_id,
                    values = removed.values.len(),
                    "Node removed from mirror"
                );
                self.bus.emit(&DriverEvent::NodeRemoved(node_id));
                Some(ReadyAction::Cancel(node_id))
            }
        }
    }

    fn handle_value(&mut self, id: ValueId, payload: &[u8]) {
        let message = match decode_state::<Value>(payload) {
            Ok(message) => message,
            Err(error) => {
                tracing::debug!(key = %id, %error, "Dropping malformed value payload");
                return;
            }
        };

        match message {
            StateMessage::Present(mut observed) => {
                // The composite key comes from the topic path; payload
                // fields never override it.
                observed.node_id = id.node_id;
                observed.class_id = id.class_id;
                observed.instance = id.instance;
                observed.index = id.index;

                let merge = match self.store.merge_value(observed) {
                    Ok(merge) => merge,
                    Err(error) => {
                        tracing::debug!(key = %id, %error, "Dropping unmergeable value record");
                        return;
                    }
                };

                if merge.node_created {
                    self.bus.emit(&DriverEvent::NodeAdded(id.node_id));
                }

                let Some(record) = self.store.value(&id).cloned() else {
                    return;
                };
                let event = match merge.kind {
                    ValueMergeKind::Added => {
                        DriverEvent::ValueAdded(id.node_id, id.class_id, record)
                    }
                    ValueMergeKind::Changed(_) => {
                        DriverEvent::ValueChanged(id.node_id, id.class_id, record)
                    }
                    ValueMergeKind::Refreshed => {
                        DriverEvent::ValueRefreshed(id.node_id, id.class_id, record)
                    }
                };
                self.bus.emit(&event);
            }
            StateMessage::Removed => {
                if self.store.remove_value(&id).is_some() {
                    self.bus
                        .emit(&DriverEvent::ValueRemoved(id.node_id, id.class_id, id));
                }
            }
        }
    }

    /// Deliver an expired ready timer.
    ///
    /// The node must still be present and ready; a node removed or
    /// regressed while the timer was pending produces nothing.
    pub fn fire_ready(&mut self, node_id: NodeId) {
        let Some(info) = self.store.node(&node_id) else {
            return;
        };
        if !info.ready {
            return;
        }
        let info = info.clone();
        tracing::debug!(node_id, "Node ready");
        self.bus.emit(&DriverEvent::NodeReady(node_id, info));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use zmirror_core::{NodeInfo, Value, ValueId};
    use zmirror_proto::encode_state;

    fn recording_mirror(kinds: &[EventKind]) -> (Mirror, Arc<Mutex<Vec<DriverEvent>>>) {
        let mut mirror = Mirror::new(TopicScheme::new("zwave"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in kinds {
            let seen = Arc::clone(&seen);
            mirror.on(*kind, move |event| {
                seen.lock().unwrap().push(event.clone());
            });
        }
        (mirror, seen)
    }

    fn switch_value(value: serde_json::Value) -> Vec<u8> {
        encode_state(&Value {
            node_id: 3,
            class_id: 37,
            instance: 1,
            index: 0,
            label: Some("Switch".to_string()),
            value: Some(value),
            ..Value::default()
        })
        .unwrap()
    }

    #[test]
    fn first_value_message_synthesizes_node_and_value_added() {
        let (mut mirror, seen) =
            recording_mirror(&[EventKind::NodeAdded, EventKind::ValueAdded]);

        let action = mirror.handle_message("zwave/node3/value37-1-0", &switch_value(json!(0)));

        assert_eq!(action, None);
        let seen = seen.lock().unwrap();
        assert!(matches!(seen[0], DriverEvent::NodeAdded(3)));
        let DriverEvent::ValueAdded(3, 37, ref record) = seen[1] else {
            panic!("expected a value added event");
        };
        assert_eq!(record.value, Some(json!(0)));
    }

    #[test]
    fn changed_and_refreshed_classify_separately() {
        let (mut mirror, seen) = recording_mirror(&[
            EventKind::ValueChanged,
            EventKind::ValueRefreshed,
        ]);

        mirror.handle_message("zwave/node3/value37-1-0", &switch_value(json!(0)));
        mirror.handle_message("zwave/node3/value37-1-0", &switch_value(json!(0)));
        mirror.handle_message("zwave/node3/value37-1-0", &switch_value(json!(1)));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], DriverEvent::ValueRefreshed(3, 37, _)));
        let DriverEvent::ValueChanged(3, 37, ref record) = seen[1] else {
            panic!("expected a value changed event");
        };
        assert_eq!(record.value, Some(json!(1)));
    }

    #[test]
    fn topic_key_overrides_payload_key() {
        let (mut mirror, _) = recording_mirror(&[]);

        // Payload claims a different node; the topic wins.
        let payload = encode_state(&Value {
            node_id: 99,
            class_id: 99,
            instance: 9,
            index: 9,
            value: Some(json!(1)),
            ..Value::default()
        })
        .unwrap();
        mirror.handle_message("zwave/node3/value37-1-0", &payload);

        assert!(mirror.store().value(&ValueId::new(3, 37, 1, 0)).is_some());
        assert!(mirror.store().node(&99).is_none());
    }

    #[test]
    fn ready_flag_schedules_timer_once() {
        let (mut mirror, _) = recording_mirror(&[]);

        let ready = encode_state(&NodeInfo {
            name: Some("Lamp".to_string()),
            ready: true,
            ..NodeInfo::default()
        })
        .unwrap();

        assert_eq!(
            mirror.handle_message("zwave/node4", &ready),
            Some(ReadyAction::Schedule(4))
        );
        // A retained re-delivery of the same record is not an edge.
        assert_eq!(mirror.handle_message("zwave/node4", &ready), None);
    }

    #[test]
    fn fired_timer_emits_ready_only_for_live_ready_nodes() {
        let (mut mirror, seen) = recording_mirror(&[EventKind::NodeReady]);

        let ready = encode_state(&NodeInfo {
            ready: true,
            ..NodeInfo::default()
        })
        .unwrap();
        mirror.handle_message("zwave/node4", &ready);

        mirror.fire_ready(4);
        assert_eq!(seen.lock().unwrap().len(), 1);

        // A timer surviving node removal fires into nothing.
        mirror.handle_message("zwave/node4", b"");
        mirror.fire_ready(4);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn node_removal_cancels_and_emits() {
        let (mut mirror, seen) =
            recording_mirror(&[EventKind::NodeRemoved, EventKind::ValueRemoved]);

        mirror.handle_message("zwave/node3/value37-1-0", &switch_value(json!(0)));
        let action = mirror.handle_message("zwave/node3", b"");

        assert_eq!(action, Some(ReadyAction::Cancel(3)));
        assert!(matches!(
            seen.lock().unwrap()[0],
            DriverEvent::NodeRemoved(3)
        ));
        assert_eq!(mirror.store().node_count(), 0);
    }

    #[test]
    fn value_removal_emits_with_composite_key() {
        let (mut mirror, seen) = recording_mirror(&[EventKind::ValueRemoved]);

        mirror.handle_message("zwave/node3/value37-1-0", &switch_value(json!(0)));
        mirror.handle_message("zwave/node3/value37-1-0", b"");

        let seen = seen.lock().unwrap();
        assert!(matches!(
            seen[0],
            DriverEvent::ValueRemoved(3, 37, id) if id == ValueId::new(3, 37, 1, 0)
        ));
        // Removal of an unknown value emits nothing.
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn malformed_and_foreign_messages_are_dropped() {
        let (mut mirror, seen) = recording_mirror(&[EventKind::NodeAdded]);

        assert_eq!(mirror.handle_message("zwave/node3", b"{not json"), None);
        assert_eq!(mirror.handle_message("other/node3", &switch_value(json!(0))), None);
        assert_eq!(mirror.handle_message("zwave/set", b"{}"), None);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(mirror.store().node_count(), 0);
    }

    #[test]
    fn naming_metadata_emits_node_naming() {
        let (mut mirror, seen) = recording_mirror(&[EventKind::NodeNaming]);

        let named = encode_state(&NodeInfo {
            name: Some("Lamp".to_string()),
            loc: Some("Kitchen".to_string()),
            ..NodeInfo::default()
        })
        .unwrap();
        mirror.handle_message("zwave/node4", &named);

        let seen = seen.lock().unwrap();
        let DriverEvent::NodeNaming(4, ref info) = seen[0] else {
            panic!("expected a node naming event");
        };
        assert_eq!(info.name.as_deref(), Some("Lamp"));
    }
}
