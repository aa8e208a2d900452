//! HVAC relay controller: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayBank        LogEventSink   ConfigStore   WifiSupervisor  │
//! │  (RelayPort)      (EventSink)    (ConfigPort)  (Connectivity)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   ModeController (pure logic) ◀── ControlTask (owner)  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                              ▲ ControlHandle                   │
//! │  HttpServer (edge-executor workers, port 11337)                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result, anyhow};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{info, warn};

use hvacrelay::adapters::config_store::{ConfigStore, load_or_default};
use hvacrelay::adapters::log_sink::LogEventSink;
use hvacrelay::adapters::wifi::{ConnectivityPort, CredentialSource, Credentials, WifiSupervisor};
use hvacrelay::app::control::{ControlHandle, ControlTask};
use hvacrelay::app::controller::ModeController;
use hvacrelay::config::SystemConfig;
use hvacrelay::drivers::relay_bank::RelayBank;
use hvacrelay::error::{CommsError, Error};
use hvacrelay::http::HttpServer;
use hvacrelay::pins::RELAY_COUNT;

// ── Startup stages ────────────────────────────────────────────

/// Force the safe pattern and hand the controller to its own thread.
fn start_control<P, D>(pins: [P; RELAY_COUNT], delay: D) -> Result<ControlHandle>
where
    P: OutputPin + Send + 'static,
    D: DelayNs + Send + 'static,
{
    let mut controller = ModeController::new(RelayBank::new(pins), delay, LogEventSink::new());
    controller
        .init()
        .map_err(Error::from)
        .context("forcing relay outputs to the safe state")?;

    let (task, handle) = ControlTask::new(controller);
    task.spawn()
        .map_err(|_| Error::from(CommsError::ControlUnavailable))
        .context("spawning control task")?;
    Ok(handle)
}

/// Connect once, then leave the keep-alive loop running.  WiFi trouble is
/// logged and never stops the relay controller.
fn start_wifi<L>(link: L, creds: Credentials, config: &SystemConfig)
where
    L: ConnectivityPort + Send + 'static,
{
    let mut supervisor = WifiSupervisor::new(link, creds, config);
    // Failure is logged inside and retried by the keep-alive loop.
    let _ = supervisor.connect_once();
    if let Err(e) = supervisor.spawn() {
        warn!("WiFi: keep-alive thread failed to start: {}", e);
    }
}

fn wifi_credentials(source: &impl CredentialSource) -> Option<Credentials> {
    match source.credentials() {
        Ok(Some(creds)) => Some(creds),
        Ok(None) => {
            info!("WiFi: no SSID configured, skipping WiFi connection");
            None
        }
        Err(e) => {
            warn!("WiFi: {}, skipping WiFi connection", e);
            None
        }
    }
}

fn serve(config: &SystemConfig, control: ControlHandle) -> Result<()> {
    let server = HttpServer::bind(config)
        .map_err(Error::from)
        .context("binding request server")?;
    server
        .spawn(control)
        .map_err(|_| Error::Init("http-io thread"))?
        .join()
        .map_err(|_| anyhow!("request server thread panicked"))
}

fn banner() {
    info!("╔══════════════════════════════════════╗");
    info!("║  HVAC relay controller v{:<12} ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
}

// ── Main (ESP-IDF) ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use hvacrelay::adapters::wifi::{BuildTimeCredentials, EspWifiLink};
    use hvacrelay::drivers::relay_bank::device_pins;

    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    banner();

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let config = match ConfigStore::open(nvs.clone()) {
        Ok(store) => load_or_default(&store),
        Err(e) => {
            warn!("NVS config store unavailable ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3-4. Relay bank + control task ────────────────────────
    let pins = device_pins()
        .map_err(Error::from)
        .context("claiming relay GPIOs")?;
    let control = start_control(pins, FreeRtos)?;

    // ── 5. WiFi ───────────────────────────────────────────────
    if let Some(creds) = wifi_credentials(&BuildTimeCredentials) {
        match EspWifiLink::new(peripherals.modem, sysloop, nvs) {
            Ok(link) => start_wifi(link, creds, &config),
            Err(e) => warn!("WiFi: {}", e),
        }
    }

    // ── 6. Request server ─────────────────────────────────────
    serve(&config, control)
}

// ── Main (host simulation) ────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use hvacrelay::adapters::wifi::{FileCredentials, SimLink};
    use hvacrelay::drivers::delay::StdDelay;
    use hvacrelay::drivers::relay_bank::sim_pins;

    // ── 1. Logger ─────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    banner();

    // ── 2. Config file (or defaults) ──────────────────────────
    let path = std::env::var("HVAC_CONFIG").unwrap_or_else(|_| "hvacrelay.json".into());
    let config = load_or_default(&ConfigStore::open(path));

    // ── 3-4. Relay bank + control task ────────────────────────
    // Simulated pins power up high so the safe-state forcing is visible.
    let control = start_control(sim_pins(true), StdDelay)?;

    // ── 5. WiFi ───────────────────────────────────────────────
    let dir = std::env::var("HVAC_WIFI_DIR").unwrap_or_else(|_| ".".into());
    if let Some(creds) = wifi_credentials(&FileCredentials::new(dir)) {
        start_wifi(SimLink::new(), creds, &config);
    }

    // ── 6. Request server ─────────────────────────────────────
    serve(&config, control)
}
