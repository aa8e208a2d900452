//! System configuration parameters
//!
//! All tunable parameters for the relay controller.  The relay settle delay
//! is deliberately absent: it is a hardware constant
//! ([`SETTLE_DELAY_MS`](crate::fsm::SETTLE_DELAY_MS)).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Upper bound on HTTP worker tasks (executor capacity).
pub const MAX_HTTP_WORKERS: u8 = 8;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Request server ---
    /// TCP port the request server listens on
    pub http_port: u16,
    /// Accept backlog for the listening socket
    pub listen_backlog: u8,
    /// Concurrent connection workers
    pub http_workers: u8,
    /// Per-connection deadline for receiving a request (milliseconds)
    pub request_timeout_ms: u32,

    // --- Connectivity ---
    /// How long to wait for association on each connect attempt (seconds)
    pub wifi_connect_timeout_secs: u32,
    /// Keep-alive check / reconnect interval (seconds)
    pub wifi_retry_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Request server
            http_port: 11337,
            listen_backlog: 5,
            http_workers: 4,
            request_timeout_ms: 5_000,

            // Connectivity
            wifi_connect_timeout_secs: 20,
            wifi_retry_interval_secs: 300, // 5 min
        }
    }
}

impl SystemConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_port == 0 {
            return Err(ConfigError::ValidationFailed("http_port must be non-zero"));
        }
        if self.listen_backlog == 0 {
            return Err(ConfigError::ValidationFailed("listen_backlog must be at least 1"));
        }
        if self.http_workers == 0 || self.http_workers > MAX_HTTP_WORKERS {
            return Err(ConfigError::ValidationFailed("http_workers must be 1-8"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("request_timeout_ms must be non-zero"));
        }
        if self.wifi_connect_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "wifi_connect_timeout_secs must be non-zero",
            ));
        }
        if self.wifi_retry_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "wifi_retry_interval_secs must be non-zero",
            ));
        }
        Ok(())
    }
}
