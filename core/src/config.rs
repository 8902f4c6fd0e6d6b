//! Client configuration.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://neocities.org";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings shared by every call a `NeocitiesClient` makes.
///
/// TLS verification and the no-redirect policy are not configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Upper bound on connection establishment.
    pub connect_timeout: Duration,
    /// Upper bound on the whole transfer, connect included.
    pub timeout: Duration,
    /// Largest response body accepted; larger bodies fail as out-of-memory.
    pub max_response_bytes: Option<usize>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = Some(limit);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            max_response_bytes: None,
        }
    }
}
