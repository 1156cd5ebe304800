//! The remote driver facade over MQTT.
//!
//! `RemoteAdapter` subscribes to a gateway's retained mirror topics,
//! feeds every message through the [`Mirror`], and exposes the
//! reconstructed driver surface: events via callbacks and writes via a
//! [`RemoteControl`] handle that publishes commands to the shared `set`
//! topic. Remote writes never mutate the local mirror; the resulting
//! state change arrives back as a mirrored message.

use crate::broker::{parse_broker_url, BrokerUrlError};
use crate::mirror::{Mirror, ReadyAction};
use crate::ready::{ReadyTimers, DEFAULT_READY_DELAY};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use zmirror_core::{NodeId, ValueId};
use zmirror_driver::{DeviceControl, DriverError, DriverEvent, EventKind, EventNameError};
use zmirror_proto::{encode_command, Command, TopicScheme};

/// Configuration for the remote adapter.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// MQTT broker URL (e.g., <tcp://localhost:1883>)
    pub mqtt_broker: String,
    /// Topic prefix of the gateway to mirror.
    pub prefix: String,
    /// Client ID for the MQTT connection.
    pub client_id: String,
    /// Settle delay before announcing a node ready.
    pub ready_delay: Duration,
    /// Keep-alive interval.
    pub keep_alive: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            mqtt_broker: "tcp://localhost:1883".to_string(),
            prefix: "zwave".to_string(),
            client_id: format!("zmirror-remote-{}", uuid::Uuid::new_v4()),
            ready_delay: DEFAULT_READY_DELAY,
            keep_alive: Duration::from_secs(30),
        }
    }
}

/// Errors for the remote adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// The broker address is unusable.
    #[error(transparent)]
    InvalidBrokerUrl(#[from] BrokerUrlError),
    /// Subscription failed.
    #[error("subscription error: {0}")]
    Subscribe(String),
}

/// Driver facade reconstructed from a gateway's mirror topics.
pub struct RemoteAdapter {
    client: AsyncClient,
    topics: TopicScheme,
    mirror: Mirror,
    timers: ReadyTimers,
    ready_rx: mpsc::UnboundedReceiver<NodeId>,
}

impl RemoteAdapter {
    /// Create a remote adapter and the event loop that drives it.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::InvalidBrokerUrl`] for an unusable broker
    /// address.
    pub fn new(config: &RemoteConfig) -> Result<(Self, EventLoop), RemoteError> {
        let (host, port) = parse_broker_url(&config.mqtt_broker)?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, host, port);
        mqtt_options.set_keep_alive(config.keep_alive);

        let (client, eventloop) = AsyncClient::new(mqtt_options, 100);

        let topics = TopicScheme::new(config.prefix.clone());
        let (timers, ready_rx) = ReadyTimers::new(config.ready_delay);

        Ok((
            Self {
                client,
                topics: topics.clone(),
                mirror: Mirror::new(topics),
                timers,
                ready_rx,
            },
            eventloop,
        ))
    }

    /// Register an event callback by kind.
    pub fn on<F>(&mut self, kind: EventKind, callback: F)
    where
        F: FnMut(&DriverEvent) + Send + 'static,
    {
        self.mirror.on(kind, callback);
    }

    /// Register an event callback by name, e.g. `"node ready"`.
    ///
    /// # Errors
    ///
    /// Returns [`EventNameError`] for unrecognized event names.
    pub fn on_named<F>(&mut self, name: &str, callback: F) -> Result<(), EventNameError>
    where
        F: FnMut(&DriverEvent) + Send + 'static,
    {
        self.mirror.on_named(name, callback)
    }

    /// The reconstructed state.
    #[must_use]
    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// A detachable write handle for this adapter's gateway.
    #[must_use]
    pub fn handle(&self) -> RemoteControl {
        RemoteControl {
            client: self.client.clone(),
            topics: self.topics.clone(),
        }
    }

    /// Subscribe to every topic under the gateway's prefix.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Subscribe`] if the subscription cannot be
    /// queued.
    pub async fn subscribe(&self) -> Result<(), RemoteError> {
        let topic = self.topics.wildcard();

        tracing::info!(topic, "Subscribing to mirror topics");

        self.client
            .subscribe(&topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| RemoteError::Subscribe(e.to_string()))?;

        Ok(())
    }

    /// Drive the adapter until the event loop ends.
    ///
    /// Consumes mirror messages and ready-timer expiries; transient MQTT
    /// errors are logged and retried after a delay.
    pub async fn run(mut self, mut eventloop: EventLoop) {
        loop {
            tokio::select! {
                event = eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        tracing::debug!(
                            topic = publish.topic,
                            payload_len = publish.payload.len(),
                            "Received mirror message"
                        );
                        match self.mirror.handle_message(&publish.topic, &publish.payload) {
                            Some(ReadyAction::Schedule(node_id)) => self.timers.schedule(node_id),
                            Some(ReadyAction::Cancel(node_id)) => self.timers.cancel(node_id),
                            None => {}
                        }
                    }
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!("Connected to MQTT broker");
                    }
                    Ok(Event::Incoming(Packet::SubAck(_))) => {
                        tracing::info!("Subscription acknowledged");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "MQTT error");
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                },
                Some(node_id) = self.ready_rx.recv() => {
                    self.timers.finished(node_id);
                    self.mirror.fire_ready(node_id);
                }
            }
        }
    }
}

/// Write handle publishing commands to the gateway's `set` topic.
///
/// Operations are fire-and-forget: success means the command was queued
/// for delivery. The effect, if any, arrives later as mirrored state.
#[derive(Debug, Clone)]
pub struct RemoteControl {
    client: AsyncClient,
    topics: TopicScheme,
}

impl RemoteControl {
    fn send(&self, command: &Command) -> Result<(), DriverError> {
        let payload =
            encode_command(command).map_err(|e| DriverError::Transport(e.to_string()))?;

        tracing::debug!(
            topic = self.topics.set(),
            node_id = command.node_id(),
            "Publishing command"
        );

        self.client
            .try_publish(self.topics.set(), QoS::AtLeastOnce, false, payload)
            .map_err(|e| DriverError::Transport(e.to_string()))
    }
}

impl DeviceControl for RemoteControl {
    fn connect(&mut self, _device: &str) -> Result<(), DriverError> {
        self.client
            .try_subscribe(self.topics.wildcard(), QoS::AtLeastOnce)
            .map_err(|e| DriverError::Transport(e.to_string()))
    }

    fn disconnect(&mut self, _device: &str) -> Result<(), DriverError> {
        self.client
            .try_unsubscribe(self.topics.wildcard())
            .map_err(|e| DriverError::Transport(e.to_string()))
    }

    fn set_value(&mut self, id: &ValueId, value: &serde_json::Value) -> Result<(), DriverError> {
        self.send(&Command::value(id, value.clone()))
    }

    fn set_node_on(&mut self, node_id: NodeId) -> Result<(), DriverError> {
        self.send(&Command::On { node_id })
    }

    fn set_node_off(&mut self, node_id: NodeId) -> Result<(), DriverError> {
        self.send(&Command::Off { node_id })
    }

    fn set_level(&mut self, node_id: NodeId, level: u8) -> Result<(), DriverError> {
        self.send(&Command::Level {
            node_id,
            value: level,
        })
    }

    fn set_node_location(&mut self, node_id: NodeId, location: &str) -> Result<(), DriverError> {
        self.send(&Command::Location {
            node_id,
            value: location.to_string(),
        })
    }

    fn set_node_name(&mut self, node_id: NodeId, name: &str) -> Result<(), DriverError> {
        self.send(&Command::Name {
            node_id,
            value: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_config_has_unique_client_ids() {
        let a = RemoteConfig::default();
        let b = RemoteConfig::default();

        assert_ne!(a.client_id, b.client_id);
        assert_eq!(a.prefix, "zwave");
        assert_eq!(a.ready_delay, DEFAULT_READY_DELAY);
    }

    #[test]
    fn control_queues_commands_without_a_broker() {
        let (adapter, _eventloop) = RemoteAdapter::new(&RemoteConfig::default()).unwrap();
        let mut control = adapter.handle();

        control.set_node_on(3).unwrap();
        control.set_level(4, 80).unwrap();
        control
            .set_value(&ValueId::new(5, 37, 1, 0), &json!(1))
            .unwrap();
    }

    #[test]
    fn bad_broker_url_is_rejected_at_construction() {
        let config = RemoteConfig {
            mqtt_broker: "http://nope".to_string(),
            ..RemoteConfig::default()
        };

        assert!(RemoteAdapter::new(&config).is_err());
    }
}
