//! Gateway runtime orchestration.
//!
//! The gateway mirrors driver state outward and replays commands inward:
//! every driver event updates the local store and, where the event is an
//! actual state change, publishes the post-merge record retained on its
//! topic; every message on the `set` topic decodes into commands that
//! dispatch to the driver after value transforms.

use crate::config::{DriverKind, GatewayConfig};
use crate::mqtt::{MirrorSink, MqttSink};
use crate::transform::TransformTable;
use anyhow::{Context, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use zmirror_core::{NodeId, NodeInfo, Store, Value, ValueId, ValueMergeKind};
use zmirror_driver::{DeviceControl, DriverEvent, EventKind, MockDriver};
use zmirror_proto::{decode_commands, encode_state, Command, TopicScheme};
use zmirror_remote::{parse_broker_url, RemoteAdapter, RemoteConfig};

/// The gateway core: store, topic scheme, sink, and driver handle.
///
/// Generic over the sink so the full publish pipeline runs in tests
/// without a broker.
pub struct Gateway<S: MirrorSink> {
    topics: TopicScheme,
    store: Store,
    sink: S,
    control: Box<dyn DeviceControl>,
    transforms: TransformTable,
}

impl<S: MirrorSink> Gateway<S> {
    /// Assemble a gateway.
    #[must_use]
    pub fn new(
        topics: TopicScheme,
        sink: S,
        control: Box<dyn DeviceControl>,
        transforms: TransformTable,
    ) -> Self {
        Self {
            topics,
            store: Store::new(),
            sink,
            control,
            transforms,
        }
    }

    /// The mirrored state.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Attach the driver to its device.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver refuses the attach.
    pub fn connect_driver(&mut self, device: &str) -> Result<()> {
        self.control
            .connect(device)
            .with_context(|| format!("Failed to connect driver to {device}"))
    }

    /// Ingest one driver event, updating the store and the mirror.
    pub fn handle_driver_event(&mut self, event: &DriverEvent) {
        match event {
            DriverEvent::DriverReady(home_id) => {
                tracing::info!(home_id, "Driver ready, scanning network");
            }
            DriverEvent::DriverFailed => {
                tracing::error!("Driver failed to initialize");
            }
            DriverEvent::ScanComplete => {
                tracing::info!(nodes = self.store.node_count(), "Network scan complete");
            }
            DriverEvent::NodeAdded(node_id) => {
                self.merge_and_publish_node(*node_id, &NodeInfo::default());
            }
            DriverEvent::NodeNaming(node_id, info)
            | DriverEvent::NodeAvailable(node_id, info) => {
                self.merge_and_publish_node(*node_id, info);
            }
            DriverEvent::NodeReady(node_id, info) => {
                let mut info = info.clone();
                info.ready = true;
                info.values = Some(self.store.value_keys_of(*node_id));
                self.merge_and_publish_node(*node_id, &info);
            }
            DriverEvent::NodeRemoved(node_id) => self.remove_node(*node_id),
            DriverEvent::NodeEvent(node_id, data) => {
                self.publish_transient(&self.topics.node_event(*node_id), data);
            }
            DriverEvent::SceneEvent(node_id, scene_id) => {
                self.publish_transient(
                    &self.topics.node_scene(*node_id),
                    &serde_json::json!(scene_id),
                );
            }
            DriverEvent::ValueAdded(_, _, value)
            | DriverEvent::ValueChanged(_, _, value)
            | DriverEvent::ValueRefreshed(_, _, value) => self.merge_value(value),
            DriverEvent::ValueRemoved(_, _, id) => self.remove_value(id),
            DriverEvent::PollingEnabled(node_id) => {
                tracing::debug!(node_id, "Polling enabled");
            }
            DriverEvent::PollingDisabled(node_id) => {
                tracing::debug!(node_id, "Polling disabled");
            }
            DriverEvent::ControllerCommand(node_id, data) => {
                tracing::debug!(node_id, %data, "Controller command progress");
            }
        }
    }

    /// Decode a command payload and dispatch its elements in order.
    ///
    /// A malformed element is logged and skipped; the remaining
    /// elements still dispatch.
    pub fn handle_command_payload(&mut self, payload: &[u8]) {
        let commands = match decode_commands(payload) {
            Ok(commands) => commands,
            Err(error) => {
                tracing::warn!(%error, payload_len = payload.len(), "Unusable command payload");
                return;
            }
        };

        for command in commands {
            match command {
                Ok(command) => self.dispatch(command),
                Err(error) => tracing::warn!(%error, "Skipping malformed command"),
            }
        }
    }

    fn dispatch(&mut self, command: Command) {
        let node_id = command.node_id();
        let outcome = match command {
            Command::Value {
                node_id,
                class_id,
                instance,
                index,
                value,
            } => {
                let id = ValueId::new(node_id, class_id, instance, index);
                let coerced = self.transforms.apply(&id, &value);
                self.control.set_value(&id, &coerced)
            }
            Command::On { node_id } => self.control.set_node_on(node_id),
            Command::Off { node_id } => self.control.set_node_off(node_id),
            Command::Level { node_id, value } => self.control.set_level(node_id, value),
            Command::Location { node_id, value } => {
                self.control.set_node_location(node_id, &value)
            }
            Command::Name { node_id, value } => self.control.set_node_name(node_id, &value),
        };

        if let Err(error) = outcome {
            tracing::warn!(node_id, %error, "Driver rejected command");
        }
    }

    fn merge_and_publish_node(&mut self, node_id: NodeId, info: &NodeInfo) {
        match self.store.merge_node(node_id, info) {
            Ok(merge) => {
                if merge.became_ready {
                    tracing::info!(node_id, "Node ready");
                }
            }
            Err(error) => {
                tracing::warn!(node_id, %error, "Dropping unmergeable node record");
                return;
            }
        }

        let Some(record) = self.store.node(&node_id) else {
            return;
        };
        match encode_state(record) {
            Ok(payload) => self.sink.publish(&self.topics.node(node_id), payload, true),
            Err(error) => tracing::warn!(node_id, %error, "Failed to encode node record"),
        }
    }

    fn merge_value(&mut self, observed: &Value) {
        let id = observed.id();
        let merge = match self.store.merge_value(observed.clone()) {
            Ok(merge) => merge,
            Err(error) => {
                tracing::warn!(key = %id, %error, "Dropping unmergeable value record");
                return;
            }
        };

        // Refreshed observations keep the store warm but stay off the
        // wire; the retained record is already current.
        if matches!(merge.kind, ValueMergeKind::Refreshed) {
            tracing::debug!(key = %id, "Value refreshed");
            return;
        }

        let Some(record) = self.store.value(&id) else {
            return;
        };
        match encode_state(record) {
            Ok(payload) => self.sink.publish(&self.topics.value(&id), payload, true),
            Err(error) => tracing::warn!(key = %id, %error, "Failed to encode value record"),
        }
    }

    fn remove_value(&mut self, id: &ValueId) {
        // Sentinel first, then the store; a crash between the two leaves
        // a retained tombstone rather than a stale record.
        self.sink
            .publish(&self.topics.value(id), Vec::new(), true);
        if self.store.remove_value(id).is_none() {
            tracing::debug!(key = %id, "Removal for unknown value");
        }
    }

    fn remove_node(&mut self, node_id: NodeId) {
        let Some(removed) = self.store.remove_node(node_id) else {
            tracing::debug!(node_id, "Removal for unknown node");
            return;
        };

        for value in &removed.values {
            self.sink
                .publish(&self.topics.value(&value.id()), Vec::new(), true);
        }
        self.sink.publish(&self.topics.node(node_id), Vec::new(), true);

        tracing::info!(node_id, values = removed.values.len(), "Node removed");
    }

    fn publish_transient<T: serde::Serialize>(&self, topic: &str, data: &T) {
        match encode_state(data) {
            Ok(payload) => self.sink.publish(topic, payload, false),
            Err(error) => tracing::warn!(topic, %error, "Failed to encode transient event"),
        }
    }
}

/// Run the gateway until shutdown.
///
/// # Errors
///
/// Returns an error if the broker address is unusable, the initial
/// subscription fails, or the driver refuses to connect.
pub async fn run(config: GatewayConfig) -> Result<()> {
    let (host, port) = parse_broker_url(&config.mqtt_broker)?;

    let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
    mqtt_options.set_keep_alive(config.keep_alive);
    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);

    let topics = TopicScheme::new(config.prefix.clone());
    let set_topic = topics.set();
    client
        .subscribe(&set_topic, QoS::AtLeastOnce)
        .await
        .context("Failed to subscribe to the command topic")?;

    let transforms = config
        .transforms
        .clone()
        .map_or_else(TransformTable::with_defaults, TransformTable::new);

    let (control, mut events) = build_driver(&config).await?;

    let mut gateway = Gateway::new(topics, MqttSink::new(client), control, transforms);
    gateway.connect_driver(&config.device)?;

    tracing::info!(
        prefix = config.prefix,
        device = config.device,
        "Gateway running, press Ctrl+C to stop"
    );

    loop {
        tokio::select! {
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic == set_topic {
                        tracing::debug!(
                            payload_len = publish.payload.len(),
                            "Received command payload"
                        );
                        gateway.handle_command_payload(&publish.payload);
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("Connected to MQTT broker");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "MQTT error");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            },
            Some(event) = events.recv() => {
                gateway.handle_driver_event(&event);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn build_driver(
    config: &GatewayConfig,
) -> Result<(Box<dyn DeviceControl>, mpsc::UnboundedReceiver<DriverEvent>)> {
    match &config.driver {
        DriverKind::Mock => {
            let (driver, events) = MockDriver::new();
            Ok((Box::new(driver), events))
        }
        DriverKind::Remote { prefix } => {
            let remote_config = RemoteConfig {
                mqtt_broker: config.mqtt_broker.clone(),
                prefix: prefix.clone(),
                ..RemoteConfig::default()
            };
            let (mut adapter, remote_eventloop) = RemoteAdapter::new(&remote_config)
                .context("Failed to create the remote driver")?;

            let (tx, events) = mpsc::unbounded_channel();
            for kind in EventKind::ALL {
                let tx = tx.clone();
                adapter.on(kind, move |event| {
                    let _ = tx.send(event.clone());
                });
            }

            adapter
                .subscribe()
                .await
                .context("Failed to subscribe to the upstream mirror")?;
            let control = adapter.handle();
            tokio::spawn(adapter.run(remote_eventloop));

            Ok((Box::new(control), events))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use zmirror_driver::ControlCall;
    use zmirror_remote::Mirror;

    type Message = (String, Vec<u8>, bool);

    #[derive(Debug, Clone, Default)]
    struct RecordingSink {
        messages: Arc<Mutex<Vec<Message>>>,
    }

    impl RecordingSink {
        fn messages(&self) -> Vec<Message> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl MirrorSink for RecordingSink {
        fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) {
            self.messages
                .lock()
                .unwrap()
                .push((topic.to_string(), payload, retain));
        }
    }

    fn test_gateway() -> (Gateway<RecordingSink>, RecordingSink, MockDriver) {
        let sink = RecordingSink::default();
        let (driver, _events) = MockDriver::new();
        let gateway = Gateway::new(
            TopicScheme::new("zwave"),
            sink.clone(),
            Box::new(driver.clone()),
            TransformTable::with_defaults(),
        );
        (gateway, sink, driver)
    }

    fn switch_value(node_id: NodeId, value: serde_json::Value) -> Value {
        Value {
            node_id,
            class_id: 37,
            instance: 1,
            index: 0,
            label: Some("Switch".to_string()),
            value: Some(value),
            ..Value::default()
        }
    }

    #[test]
    fn node_lifecycle_publishes_retained_records() {
        let (mut gateway, sink, _) = test_gateway();

        gateway.handle_driver_event(&DriverEvent::NodeAdded(3));
        gateway.handle_driver_event(&DriverEvent::ValueAdded(3, 37, switch_value(3, json!(0))));
        gateway.handle_driver_event(&DriverEvent::NodeReady(3, NodeInfo {
            name: Some("Lamp".to_string()),
            ..NodeInfo::default()
        }));

        let messages = sink.messages();
        assert_eq!(messages[0].0, "zwave/node3");
        assert!(messages[0].2);
        assert_eq!(messages[1].0, "zwave/node3/value37-1-0");

        let ready: NodeInfo = serde_json::from_slice(&messages[2].1).unwrap();
        assert!(ready.ready);
        assert_eq!(ready.name.as_deref(), Some("Lamp"));
        assert_eq!(ready.values, Some(vec!["3-37-1-0".to_string()]));
    }

    #[test]
    fn refreshed_values_stay_off_the_wire() {
        let (mut gateway, sink, _) = test_gateway();

        gateway.handle_driver_event(&DriverEvent::ValueAdded(3, 37, switch_value(3, json!(0))));
        // The driver re-reports the same state.
        gateway.handle_driver_event(&DriverEvent::ValueChanged(3, 37, switch_value(3, json!(0))));
        gateway.handle_driver_event(&DriverEvent::ValueChanged(3, 37, switch_value(3, json!(1))));

        let messages = sink.messages();
        assert_eq!(messages.len(), 2);
        let last: Value = serde_json::from_slice(&messages[1].1).unwrap();
        assert_eq!(last.value, Some(json!(1)));
    }

    #[test]
    fn node_removal_publishes_sentinels_values_first() {
        let (mut gateway, sink, _) = test_gateway();

        gateway.handle_driver_event(&DriverEvent::ValueAdded(3, 37, switch_value(3, json!(0))));
        gateway.handle_driver_event(&DriverEvent::NodeRemoved(3));

        let messages = sink.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].0, "zwave/node3/value37-1-0");
        assert!(messages[1].1.is_empty());
        assert!(messages[1].2);
        assert_eq!(messages[2].0, "zwave/node3");
        assert!(messages[2].1.is_empty());
        assert_eq!(gateway.store().node_count(), 0);
    }

    #[test]
    fn transient_events_are_not_retained() {
        let (mut gateway, sink, _) = test_gateway();

        gateway.handle_driver_event(&DriverEvent::NodeEvent(3, json!(255)));
        gateway.handle_driver_event(&DriverEvent::SceneEvent(3, 2));

        let messages = sink.messages();
        assert_eq!(messages[0].0, "zwave/node3/event");
        assert!(!messages[0].2);
        assert_eq!(messages[1].0, "zwave/node3/scene");
        assert_eq!(messages[1].1, b"2");
    }

    #[test]
    fn commands_dispatch_with_transforms_and_skip_bad_elements() {
        let (mut gateway, _, driver) = test_gateway();

        gateway.handle_command_payload(
            br#"[
                {"cmd":"on","nodeId":3},
                {"cmd":"bogus"},
                {"cmd":"value","nodeId":4,"classId":37,"instance":1,"index":0,"value":"on"},
                {"cmd":"level","nodeId":5,"value":80}
            ]"#,
        );

        assert_eq!(
            driver.calls(),
            vec![
                ControlCall::SetValue(ValueId::new(3, 37, 1, 0), json!(1)),
                ControlCall::SetValue(ValueId::new(4, 37, 1, 0), json!(1)),
                ControlCall::SetValue(ValueId::new(5, 38, 1, 0), json!(80)),
            ]
        );
    }

    #[test]
    fn mirror_reconstructs_gateway_state_from_published_messages() {
        let (mut gateway, sink, _) = test_gateway();

        gateway.handle_driver_event(&DriverEvent::NodeAdded(3));
        gateway.handle_driver_event(&DriverEvent::ValueAdded(3, 37, switch_value(3, json!(0))));
        gateway.handle_driver_event(&DriverEvent::ValueChanged(3, 37, switch_value(3, json!(1))));
        gateway.handle_driver_event(&DriverEvent::NodeReady(3, NodeInfo::default()));

        let mut mirror = Mirror::new(TopicScheme::new("zwave"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        for kind in [EventKind::NodeAdded, EventKind::ValueAdded, EventKind::ValueChanged] {
            let seen = Arc::clone(&seen);
            mirror.on(kind, move |event| seen.lock().unwrap().push(event.kind()));
        }

        for (topic, payload, _) in sink.messages() {
            mirror.handle_message(&topic, &payload);
        }

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventKind::NodeAdded,
                EventKind::ValueAdded,
                EventKind::ValueChanged,
            ]
        );
        let reconstructed = mirror.store().value(&ValueId::new(3, 37, 1, 0)).unwrap();
        assert_eq!(reconstructed.value, Some(json!(1)));
        assert!(mirror.store().node(&3).unwrap().ready);
    }
}
