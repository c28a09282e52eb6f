use std::time::Duration;

/// Default bound for DNS resolution plus TCP connect, and for the TLS handshake
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts applied to every certificate probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Bound for name resolution and, separately, for the TCP connect
    pub connect_timeout: Duration,
    /// Bound for the TLS handshake and the closing `close_notify`
    pub handshake_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_TIMEOUT,
            handshake_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProbeConfig {
    #[must_use]
    pub const fn new(connect_timeout: Duration, handshake_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            handshake_timeout,
        }
    }
}
