//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                   |
//! |----------------|--------------------|-------------------------------|
//! | `config_store` | ConfigPort         | NVS blob / JSON file          |
//! | `log_sink`     | EventSink          | Serial log output             |
//! | `wifi`         | ConnectivityPort   | ESP-IDF WiFi STA / simulation |
//! |                | CredentialSource   | Build-time env / `.ssid` files|

pub mod config_store;
pub mod log_sink;
pub mod wifi;
