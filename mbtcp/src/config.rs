use std::net::SocketAddr;
use std::time::Duration;

use crate::decode::DecodeLevel;

/// Settings for a client connection
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct ClientConfig {
    /// address of the Modbus server
    pub target: SocketAddr,
    /// how long to wait for a connection or a complete response
    pub response_timeout: Duration,
    /// re-read the affected range after a multiple or mask write
    pub echo_writes: bool,
    /// what gets logged for each exchange
    pub decode: DecodeLevel,
}

impl ClientConfig {
    /// default Modbus TCP port
    pub const DEFAULT_PORT: u16 = 502;
    /// default response timeout
    pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

    /// create a configuration for `target` with every other field defaulted
    pub fn new(target: SocketAddr) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// set the server address
    pub fn target(mut self, target: SocketAddr) -> Self {
        self.target = target;
        self
    }

    /// set the response timeout
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// enable or disable the read-back after multiple and mask writes
    pub fn echo_writes(mut self, enabled: bool) -> Self {
        self.echo_writes = enabled;
        self
    }

    /// set the decode level
    pub fn decode(mut self, decode: DecodeLevel) -> Self {
        self.decode = decode;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target: SocketAddr::from(([127, 0, 0, 1], Self::DEFAULT_PORT)),
            response_timeout: Self::DEFAULT_RESPONSE_TIMEOUT,
            echo_writes: false,
            decode: DecodeLevel::nothing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::PduDecodeLevel;

    #[test]
    fn defaults_to_local_server_without_echo() {
        let config = ClientConfig::default();
        assert_eq!(config.target.to_string(), "127.0.0.1:502");
        assert_eq!(config.response_timeout, Duration::from_millis(500));
        assert!(!config.echo_writes);
        assert_eq!(config.decode, DecodeLevel::nothing());
    }

    #[test]
    fn builder_overrides_fields() {
        let target = SocketAddr::from(([10, 0, 0, 2], 5020));
        let config = ClientConfig::new(target)
            .response_timeout(Duration::from_secs(2))
            .echo_writes(true)
            .decode(PduDecodeLevel::DataValues.into());
        assert_eq!(config.target, target);
        assert_eq!(config.response_timeout, Duration::from_secs(2));
        assert!(config.echo_writes);
        assert_eq!(config.decode.pdu, PduDecodeLevel::DataValues);
    }
}
