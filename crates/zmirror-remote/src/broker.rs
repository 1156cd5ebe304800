//! MQTT broker address parsing.

use url::Url;

/// Error for an unusable broker address.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid MQTT broker URL: {0}")]
pub struct BrokerUrlError(pub String);

/// Parse a broker address into host and port.
///
/// Accepts `tcp://` and `mqtt://` URLs as well as bare `host[:port]`
/// pairs; the port defaults to 1883.
///
/// # Errors
///
/// Returns [`BrokerUrlError`] for unsupported schemes, missing hosts,
/// or unparseable ports.
pub fn parse_broker_url(input: &str) -> Result<(String, u16), BrokerUrlError> {
    if input.contains("://") {
        let url = Url::parse(input).map_err(|e| BrokerUrlError(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(BrokerUrlError(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| BrokerUrlError(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BrokerUrlError(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port
            .parse()
            .map_err(|_| BrokerUrlError(format!("{input}: invalid port '{port}'")))?,
    };
    if parts.next().is_some() {
        return Err(BrokerUrlError(format!("{input}: too many ':' separators")));
    }

    Ok((host.to_string(), port))
}
