//! MQTT publishing seam for the gateway.

use rumqttc::{AsyncClient, QoS};

/// Where mirror messages go.
///
/// Abstracted so the publishing pipeline can be exercised without a
/// broker; the production implementation wraps the MQTT client.
pub trait MirrorSink: Send {
    /// Publish one message. Failures are the sink's problem: mirroring
    /// is best-effort and the caller never blocks on delivery.
    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool);
}

/// The production sink over an MQTT client.
#[derive(Debug, Clone)]
pub struct MqttSink {
    client: AsyncClient,
}

impl MqttSink {
    /// Wrap an MQTT client.
    #[must_use]
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

impl MirrorSink for MqttSink {
    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) {
        let payload_len = payload.len();
        if let Err(error) = self
            .client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload)
        {
            tracing::warn!(topic, payload_len, %error, "Failed to queue mirror message");
        } else {
            tracing::debug!(topic, payload_len, retain, "Published mirror message");
        }
    }
}
