//! Gateway configuration.

use crate::transform::TransformRule;
use anyhow::{bail, Context, Result};
use std::time::Duration;
use uuid::Uuid;

/// Which driver backs the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverKind {
    /// The scripted in-process driver.
    Mock,
    /// Another gateway's mirror, consumed through the remote adapter.
    Remote {
        /// Topic prefix of the upstream gateway.
        prefix: String,
    },
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// MQTT broker URL (e.g., <tcp://localhost:1883>)
    pub mqtt_broker: String,

    /// Topic prefix this gateway publishes under.
    pub prefix: String,

    /// Client ID for the MQTT connection.
    pub client_id: String,

    /// Device path handed to the driver on connect.
    pub device: String,

    /// Driver backing this gateway.
    pub driver: DriverKind,

    /// Value transforms applied to incoming write commands.
    /// `None` means the built-in defaults.
    pub transforms: Option<Vec<TransformRule>>,

    /// Keep-alive interval.
    pub keep_alive: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mqtt_broker: "tcp://localhost:1883".to_string(),
            prefix: "zwave".to_string(),
            client_id: format!("zmirror-gateway-{}", Uuid::new_v4()),
            device: "/dev/ttyUSB0".to_string(),
            driver: DriverKind::Mock,
            transforms: None,
            keep_alive: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ZMIRROR_MQTT_BROKER`: MQTT broker URL
    /// - `ZMIRROR_PREFIX`: topic prefix to publish under
    /// - `ZMIRROR_CLIENT_ID`: MQTT client ID
    /// - `ZMIRROR_DEVICE`: device path for the driver
    /// - `ZMIRROR_DRIVER`: "mock" or "remote"
    /// - `ZMIRROR_REMOTE_PREFIX`: upstream prefix for the remote driver
    /// - `ZMIRROR_TRANSFORMS`: JSON array of transform rules
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown driver kind or malformed
    /// transform JSON.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(broker) = std::env::var("ZMIRROR_MQTT_BROKER") {
            config.mqtt_broker = broker;
        }

        if let Ok(prefix) = std::env::var("ZMIRROR_PREFIX") {
            config.prefix = prefix;
        }

        if let Ok(client_id) = std::env::var("ZMIRROR_CLIENT_ID") {
            config.client_id = client_id;
        }

        if let Ok(device) = std::env::var("ZMIRROR_DEVICE") {
            config.device = device;
        }

        if let Ok(driver) = std::env::var("ZMIRROR_DRIVER") {
            config.driver = match driver.as_str() {
                "mock" => DriverKind::Mock,
                "remote" => DriverKind::Remote {
                    prefix: std::env::var("ZMIRROR_REMOTE_PREFIX")
                        .context("ZMIRROR_DRIVER=remote requires ZMIRROR_REMOTE_PREFIX")?,
                },
                other => bail!("unknown ZMIRROR_DRIVER '{other}'"),
            };
        }

        if let Ok(rules_json) = std::env::var("ZMIRROR_TRANSFORMS") {
            config.transforms =
                Some(serde_json::from_str(&rules_json).context("Invalid ZMIRROR_TRANSFORMS JSON")?);
        }

        Ok(config)
    }
}
