//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`FeederStore`] and [`ConfigPort`] for the CatFeeder
//! system.
//!
//! The slot records keep the historical fixed layout: the calibration
//! record is two raw angle bytes (slot A, slot B) and the selection
//! record is one slot-id byte (1 = A, 2 = B), each under its own key in
//! a single namespace. Writes are committed before returning — when a
//! save reports `Ok`, the record survives power loss. A record that
//! comes back short or with out-of-range content loads as the default
//! and is logged; mid-write corruption recovery is out of scope.
//!
//! Config validation: all fields are range-checked before persistence.
//! ESP-IDF NVS commits are atomic per nvs_commit(); the simulation
//! backend (host tests) achieves the same trivially.

use log::{info, warn};

use crate::app::controller::{CalibrationTable, Slot};
use crate::app::ports::{ConfigError, ConfigPort, FeederStore, StorageError};
use crate::config::FeederConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const NAMESPACE: &str = "catfeeder";
const CONFIG_KEY: &str = "syscfg";
/// Calibration record: [slot A angle, slot B angle].
const SLOTS_KEY: &str = "slots";
/// Selection record: one slot-id byte, 1 = A, 2 = B.
const SELECTED_KEY: &str = "selected";

#[allow(dead_code)]
const MAX_BLOB_SIZE: usize = 256;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    // ── Raw record access ─────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn read_record(&self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.borrow().get(key) {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_record(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store.borrow_mut().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn read_record(&self, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let result = Self::with_nvs_handle(false, |handle| {
            let key_buf = nvs_key(key);
            let mut size = buf.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        });
        match result {
            Ok(size) => Ok(size),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
            Err(_) => Err(StorageError::IoError),
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_record(&mut self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let result = Self::with_nvs_handle(true, |handle| {
            let key_buf = nvs_key(key);
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_buf.as_ptr() as *const _,
                    data.as_ptr() as *const _,
                    data.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            // Synchronous durability: do not return until the write is
            // on flash.
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        result.map_err(|e| {
            if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                StorageError::Full
            } else {
                StorageError::IoError
            }
        })
    }

    /// Open the feeder namespace, execute a closure with the handle,
    /// then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns_buf = nvs_key(NAMESPACE);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

/// NVS keys are at most 15 bytes plus NUL.
#[cfg(target_os = "espidf")]
fn nvs_key(key: &str) -> [u8; 16] {
    let mut buf = [0u8; 16];
    let bytes = key.as_bytes();
    let len = bytes.len().min(15);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

// ── Config validation ─────────────────────────────────────────

fn validate_config(cfg: &FeederConfig) -> Result<(), ConfigError> {
    if !(1..=45).contains(&cfg.step_size_deg) {
        return Err(ConfigError::ValidationFailed("step_size_deg must be 1–45"));
    }
    if !(10..=2000).contains(&cfg.step_delay_ms) {
        return Err(ConfigError::ValidationFailed(
            "step_delay_ms must be 10–2000",
        ));
    }
    if cfg.http_port == 0 {
        return Err(ConfigError::ValidationFailed("http_port must be non-zero"));
    }
    Ok(())
}

// ── ConfigPort ────────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<FeederConfig, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        match self.read_record(CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg: FeederConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", len);
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(FeederConfig::default())
            }
            Err(e) => {
                warn!("NvsAdapter: config read error ({e}), using defaults");
                Ok(FeederConfig::default())
            }
        }
    }

    fn save(&self, config: &FeederConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(CONFIG_KEY.to_string(), bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(true, |handle| {
                let key_buf = nvs_key(CONFIG_KEY);
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

// ── FeederStore ───────────────────────────────────────────────

impl FeederStore for NvsAdapter {
    fn load_calibration(&self) -> Result<CalibrationTable, StorageError> {
        let mut buf = [0u8; 2];
        match self.read_record(SLOTS_KEY, &mut buf) {
            Ok(2) => match CalibrationTable::from_record_bytes(buf[0], buf[1]) {
                Some(table) => Ok(table),
                None => {
                    warn!(
                        "NvsAdapter: calibration record out of range ({}, {}), using zeroed table",
                        buf[0], buf[1]
                    );
                    Ok(CalibrationTable::zeroed())
                }
            },
            Ok(len) => {
                warn!("NvsAdapter: calibration record short ({len} bytes), using zeroed table");
                Ok(CalibrationTable::zeroed())
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no calibration record (first boot)");
                Ok(CalibrationTable::zeroed())
            }
            Err(e) => Err(e),
        }
    }

    fn load_selection(&self) -> Result<Slot, StorageError> {
        let mut buf = [0u8; 1];
        match self.read_record(SELECTED_KEY, &mut buf) {
            Ok(1) => match Slot::from_record_byte(buf[0]) {
                Some(slot) => Ok(slot),
                None => {
                    warn!(
                        "NvsAdapter: selection record invalid ({}), defaulting to slot A",
                        buf[0]
                    );
                    Ok(Slot::A)
                }
            },
            Ok(len) => {
                warn!("NvsAdapter: selection record short ({len} bytes), defaulting to slot A");
                Ok(Slot::A)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no selection record (first boot)");
                Ok(Slot::A)
            }
            Err(e) => Err(e),
        }
    }

    fn save_calibration(&mut self, table: &CalibrationTable) -> Result<(), StorageError> {
        self.write_record(SLOTS_KEY, &table.record_bytes())
    }

    fn save_selection(&mut self, slot: Slot) -> Result<(), StorageError> {
        self.write_record(SELECTED_KEY, &[slot.wire_id()])
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        // Panics never: falls back to an empty simulation store if NVS
        // is unavailable. Only use as a last-resort fallback.
        Self::new().unwrap_or_else(|_| Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }
}
