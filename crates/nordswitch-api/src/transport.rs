// Shared transport configuration for building reqwest::Client instances.
//
// The oracle client and anything else that talks HTTP from this workspace
// go through here so timeouts and the user agent stay consistent.

use std::time::Duration;

const USER_AGENT: &str = concat!("nordswitch/", env!("CARGO_PKG_VERSION"));

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// TCP connect timeout (bounded separately so a dead route fails fast).
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl TransportConfig {
    /// Config with the given request timeout and the default connect timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: timeout.min(Self::default().connect_timeout),
        }
    }

    /// Build a `reqwest::Client` from this config.
    ///
    /// Connection pooling is disabled: after a VPN switch the old
    /// keep-alive sockets route through the previous tunnel, and reusing
    /// them would report the stale address.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(0)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| crate::error::Error::ClientBuild(e.to_string()))
    }
}
