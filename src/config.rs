//! Deadlines and response handling for a [Session](crate::session::Session)
//! and [Client](crate::client::Client).
use std::time::Duration;

/// Port srcds listens on for rcon unless told otherwise.
pub const DEFAULT_PORT: u16 = 27015;

/// What [Client::exec](crate::client::Client::exec) does once the first
/// response carrying its request id arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Return the first matching packet. Any further packets the server
    /// sends for the same command are skipped by later commands.
    #[default]
    FirstPacket,
    /// Keep reading and append every packet with the same id until the
    /// server has been quiet for `idle`. Large outputs are split by srcds
    /// into several packets sharing one id.
    Drain { idle: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub dial_timeout: Duration,
    pub auth_timeout: Duration,
    pub write_timeout: Duration,
    /// Commands can take arbitrarily long on the server, so this is generous.
    pub read_timeout: Duration,
    pub response_mode: ResponseMode,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dial_timeout: Duration::from_secs(10),
            auth_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(120),
            response_mode: ResponseMode::FirstPacket,
        }
    }
}

impl Config {
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = mode;
        self
    }
}

/// Appends [DEFAULT_PORT] to `host` if it doesn't carry a port already.
/// Bracketed IPv6 literals (`[::1]`) are handled; bare ones are left alone.
pub fn with_default_port(host: &str) -> String {
    let has_port = match host.rfind(']') {
        Some(bracket) => host[bracket..].contains(':'),
        None => host.contains(':'),
    };

    if has_port {
        host.to_string()
    } else {
        format!("{}:{}", host, DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_deadlines() {
        let config = Config::default();
        assert_eq!(config.dial_timeout, Duration::from_secs(10));
        assert_eq!(config.auth_timeout, Duration::from_secs(10));
        assert_eq!(config.write_timeout, Duration::from_secs(10));
        assert_eq!(config.read_timeout, Duration::from_secs(120));
        assert_eq!(config.response_mode, ResponseMode::FirstPacket);
    }

    #[test]
    fn builder_overrides_fields() {
        let idle = Duration::from_millis(200);
        let config = Config::default()
            .with_read_timeout(Duration::from_secs(1))
            .with_response_mode(ResponseMode::Drain { idle });
        assert_eq!(config.read_timeout, Duration::from_secs(1));
        assert_eq!(config.response_mode, ResponseMode::Drain { idle });
        assert_eq!(config.dial_timeout, Duration::from_secs(10));
    }

    #[test]
    fn default_port_is_added_when_missing() {
        assert_eq!(with_default_port("localhost"), "localhost:27015");
        assert_eq!(with_default_port("10.0.0.1:27016"), "10.0.0.1:27016");
        assert_eq!(with_default_port("[::1]"), "[::1]:27015");
        assert_eq!(with_default_port("[::1]:27020"), "[::1]:27020");
    }
}
