//! WiFi station-mode adapter and keep-alive supervisor.
//!
//! [`ConnectivityPort`] is the hexagonal boundary for the network link;
//! [`WifiSupervisor`] drives it: one connect attempt at startup, then a
//! keep-alive thread that checks the link every retry interval and
//! reconnects when it is down.  The supervisor never touches the relay
//! control path.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`EspWifiLink`] over `esp_idf_svc::wifi`,
//!   credentials baked in at build time ([`BuildTimeCredentials`]).
//! - **all other targets**: [`SimLink`], credentials read from `.ssid` /
//!   `.psk` files ([`FileCredentials`]).

use core::fmt;
use core::time::Duration;

use log::{error, info, warn};

use crate::config::SystemConfig;
use crate::drivers::task_pin::{self, Core};

// ───────────────────────────────────────────────────────────────
// Port trait
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    /// The credential store exists but could not be read.
    CredentialsUnreadable,
    ConnectionFailed,
    /// No association within the connect timeout.
    Timeout,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
            Self::CredentialsUnreadable => write!(f, "WiFi credentials unreadable"),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::Timeout => write!(f, "WiFi association timed out"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

/// A station-mode network link.
pub trait ConnectivityPort {
    /// Associate with the AP, waiting at most `timeout`.
    fn connect(&mut self, creds: &Credentials, timeout: Duration)
    -> Result<(), ConnectivityError>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(ConnectivityError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

/// Validated SSID + pre-shared key.  An empty key means an open network.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl Credentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        let mut c = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        c.ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        c.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(c)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// Never print the key.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Where the station credentials come from.
pub trait CredentialSource {
    /// `Ok(None)` means no SSID is configured and WiFi should be skipped.
    fn credentials(&self) -> Result<Option<Credentials>, ConnectivityError>;
}

/// `.ssid` (required) and `.psk` (optional) files in one directory.
/// Surrounding whitespace in either file is ignored.
pub struct FileCredentials {
    dir: std::path::PathBuf,
}

impl FileCredentials {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read(&self, name: &str) -> Result<Option<String>, ConnectivityError> {
        match std::fs::read_to_string(self.dir.join(name)) {
            Ok(s) => Ok(Some(s.trim().to_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!("WiFi: reading {} failed ({})", name, e);
                Err(ConnectivityError::CredentialsUnreadable)
            }
        }
    }
}

impl CredentialSource for FileCredentials {
    fn credentials(&self) -> Result<Option<Credentials>, ConnectivityError> {
        let Some(ssid) = self.read(".ssid")? else {
            return Ok(None);
        };
        let psk = self.read(".psk")?.unwrap_or_default();
        Credentials::new(&ssid, &psk).map(Some)
    }
}

/// Credentials compiled in from `HVAC_WIFI_SSID` / `HVAC_WIFI_PSK`.
pub struct BuildTimeCredentials;

impl CredentialSource for BuildTimeCredentials {
    fn credentials(&self) -> Result<Option<Credentials>, ConnectivityError> {
        match option_env!("HVAC_WIFI_SSID") {
            Some(ssid) if !ssid.is_empty() => {
                Credentials::new(ssid, option_env!("HVAC_WIFI_PSK").unwrap_or_default()).map(Some)
            }
            _ => Ok(None),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Supervisor
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32 },
}

pub struct WifiSupervisor<L> {
    link: L,
    creds: Credentials,
    state: WifiState,
    connect_timeout: Duration,
    retry_interval: Duration,
}

impl<L: ConnectivityPort> WifiSupervisor<L> {
    pub fn new(link: L, creds: Credentials, config: &SystemConfig) -> Self {
        Self {
            link,
            creds,
            state: WifiState::Disconnected,
            connect_timeout: Duration::from_secs(config.wifi_connect_timeout_secs.into()),
            retry_interval: Duration::from_secs(config.wifi_retry_interval_secs.into()),
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    #[cfg(test)]
    fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Initial association.  Failure leaves the supervisor in
    /// `Reconnecting` so the keep-alive loop picks it up.
    pub fn connect_once(&mut self) -> Result<(), ConnectivityError> {
        info!("WiFi: connecting to '{}'", self.creds.ssid());
        match self.link.connect(&self.creds, self.connect_timeout) {
            Ok(()) => {
                self.state = WifiState::Connected;
                info!("WiFi: connected");
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Reconnecting { attempt: 0 };
                Err(e)
            }
        }
    }

    /// One keep-alive tick: reconnect if the link is down.
    pub fn check(&mut self) -> WifiState {
        if self.link.is_connected() {
            self.state = WifiState::Connected;
            return self.state;
        }

        let attempt = match self.state {
            WifiState::Connected => {
                warn!("WiFi: connection lost, attempting to reconnect");
                0
            }
            WifiState::Reconnecting { attempt } => attempt + 1,
            WifiState::Disconnected => 0,
        };

        info!("WiFi: reconnect attempt {}", attempt);
        self.link.disconnect();
        self.state = match self.link.connect(&self.creds, self.connect_timeout) {
            Ok(()) => {
                info!("WiFi: reconnected");
                WifiState::Connected
            }
            Err(e) => {
                warn!("WiFi: reconnect failed: {}", e);
                WifiState::Reconnecting { attempt }
            }
        };
        self.state
    }

    /// Keep-alive loop; never returns.
    pub fn run(mut self) -> ! {
        info!(
            "WiFi: keep-alive every {}s",
            self.retry_interval.as_secs()
        );
        loop {
            std::thread::sleep(self.retry_interval);
            self.check();
        }
    }
}

impl<L: ConnectivityPort + Send + 'static> WifiSupervisor<L> {
    /// Spawn the keep-alive thread on Core 0 (PRO_CPU).
    pub fn spawn(self) -> std::io::Result<std::thread::JoinHandle<()>> {
        task_pin::spawn_on_core(Core::Pro, 5, 6, "wifi\0", move || self.run())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated link (host)
// ───────────────────────────────────────────────────────────────

/// In-memory link.  Fails a programmable number of attempts, then
/// associates; [`drop_link`](Self::drop_link) models AP loss.
#[derive(Debug, Default)]
pub struct SimLink {
    connected: bool,
    failures_left: u32,
    attempts: u32,
}

impl SimLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: times,
            ..Self::default()
        }
    }

    pub fn drop_link(&mut self) {
        self.connected = false;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl ConnectivityPort for SimLink {
    fn connect(
        &mut self,
        creds: &Credentials,
        _timeout: Duration,
    ) -> Result<(), ConnectivityError> {
        self.attempts += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            warn!("WiFi(sim): simulated failure (attempt {})", self.attempts);
            return Err(ConnectivityError::Timeout);
        }
        info!("WiFi(sim): associated with '{}'", creds.ssid());
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF link
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct EspWifiLink {
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
}

#[cfg(target_os = "espidf")]
impl EspWifiLink {
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
    ) -> Result<Self, ConnectivityError> {
        let wifi = esp_idf_svc::wifi::EspWifi::new(modem, sysloop, Some(nvs)).map_err(|e| {
            error!("WiFi(espidf): driver init failed ({})", e);
            ConnectivityError::ConnectionFailed
        })?;
        Ok(Self { wifi })
    }
}

#[cfg(target_os = "espidf")]
impl ConnectivityPort for EspWifiLink {
    fn connect(
        &mut self,
        creds: &Credentials,
        timeout: Duration,
    ) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let config = Configuration::Client(ClientConfiguration {
            ssid: creds
                .ssid()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: creds
                .password()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if creds.is_open() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });

        let failed = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi(espidf): {}", e);
            ConnectivityError::ConnectionFailed
        };
        self.wifi.set_configuration(&config).map_err(failed)?;
        if !self.wifi.is_started().map_err(failed)? {
            self.wifi.start().map_err(failed)?;
        }
        self.wifi.connect().map_err(failed)?;

        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.wifi.is_up().unwrap_or(false) {
                if let Ok(ip) = self.wifi.sta_netif().get_ip_info() {
                    info!("WiFi(espidf): IP {}", ip.ip);
                }
                return Ok(());
            }
            std::thread::sleep(Duration::from_secs(1));
        }
        Err(ConnectivityError::Timeout)
    }

    fn disconnect(&mut self) {
        let _ = self.wifi.disconnect();
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
