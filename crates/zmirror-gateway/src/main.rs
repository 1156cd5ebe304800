//! # zmirror Gateway
//!
//! Bridges a stateful device network onto MQTT.
//!
//! The gateway runs two loops against one broker connection:
//! 1. **Mirror**: driver events update the local store and publish the
//!    post-merge records retained under `<prefix>/...`
//! 2. **Command**: messages on `<prefix>/set` decode into write commands
//!    that dispatch to the driver after value transforms
//!
//! The driver itself is pluggable: a scripted mock, or another
//! gateway's mirror consumed through the remote adapter.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod config;
mod mqtt;
mod runtime;
mod transform;

pub use config::{DriverKind, GatewayConfig};
pub use runtime::Gateway;
pub use transform::{Transform, TransformRule, TransformTable};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting zmirror gateway");

    let config = GatewayConfig::from_env()?;

    runtime::run(config).await
}
