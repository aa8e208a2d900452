//! Persistent configuration adapter.
//!
//! Implements [`ConfigPort`] with the config serialised as JSON.
//!
//! - **`target_os = "espidf"`**: one blob in the default NVS partition.
//! - **all other targets**: a JSON file on disk.
//!
//! A missing record loads as [`SystemConfig::default()`].  Values are
//! range-checked on both load and save.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

/// Largest stored config blob.
const MAX_BLOB_SIZE: usize = 512;

fn decode(bytes: &[u8]) -> Result<SystemConfig, ConfigError> {
    let config: SystemConfig = serde_json::from_slice(bytes).map_err(|e| {
        warn!("Config: stored record unreadable ({})", e);
        ConfigError::Corrupted
    })?;
    config.validate()?;
    Ok(config)
}

fn encode(config: &SystemConfig) -> Result<Vec<u8>, ConfigError> {
    config.validate()?;
    let bytes = serde_json::to_vec_pretty(config).map_err(|_| ConfigError::IoError)?;
    if bytes.len() > MAX_BLOB_SIZE {
        return Err(ConfigError::ValidationFailed("serialised config too large"));
    }
    Ok(bytes)
}

/// Boot-time config: the stored record, or defaults when it cannot be read.
///
/// A readable record is written back, so the first boot leaves an editable
/// record behind.  An unreadable one is left untouched.
pub fn load_or_default(store: &impl ConfigPort) -> SystemConfig {
    match store.load() {
        Ok(config) => {
            info!("Config loaded");
            if let Err(e) = store.save(&config) {
                warn!("Config: write-back failed ({})", e);
            }
            config
        }
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Host backend: JSON file
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct ConfigStore {
    path: std::path::PathBuf,
}

#[cfg(not(target_os = "espidf"))]
impl ConfigStore {
    pub fn open(path: impl Into<std::path::PathBuf>) -> Self {
        let path = path.into();
        info!("ConfigStore: file backend ({})", path.display());
        Self { path }
    }
}

#[cfg(not(target_os = "espidf"))]
impl ConfigPort for ConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => decode(&bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SystemConfig::default()),
            Err(e) => {
                warn!("Config: read {} failed ({})", self.path.display(), e);
                Err(ConfigError::IoError)
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        let bytes = encode(config)?;
        std::fs::write(&self.path, bytes).map_err(|e| {
            warn!("Config: write {} failed ({})", self.path.display(), e);
            ConfigError::IoError
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Device backend: NVS blob
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &str = "hvacrelay";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &str = "syscfg";

#[cfg(target_os = "espidf")]
pub struct ConfigStore {
    nvs: std::cell::RefCell<esp_idf_svc::nvs::EspNvs<esp_idf_svc::nvs::NvsDefault>>,
}

#[cfg(target_os = "espidf")]
impl ConfigStore {
    pub fn open(
        partition: esp_idf_svc::nvs::EspDefaultNvsPartition,
    ) -> Result<Self, ConfigError> {
        let nvs = esp_idf_svc::nvs::EspNvs::new(partition, CONFIG_NAMESPACE, true).map_err(|e| {
            warn!("Config: NVS namespace open failed ({})", e);
            ConfigError::IoError
        })?;
        info!("ConfigStore: NVS backend");
        Ok(Self {
            nvs: std::cell::RefCell::new(nvs),
        })
    }
}

#[cfg(target_os = "espidf")]
impl ConfigPort for ConfigStore {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        let nvs = self.nvs.borrow();
        match nvs.get_raw(CONFIG_KEY, &mut buf) {
            Ok(Some(bytes)) => decode(bytes),
            Ok(None) => Ok(SystemConfig::default()),
            Err(e) => {
                warn!("Config: NVS read failed ({})", e);
                Err(ConfigError::IoError)
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        let bytes = encode(config)?;
        self.nvs
            .borrow_mut()
            .set_raw(CONFIG_KEY, &bytes)
            .map(|_| ())
            .map_err(|e| {
                warn!("Config: NVS write failed ({})", e);
                ConfigError::IoError
            })
    }
}
