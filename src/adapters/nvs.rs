//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`FloatStore`] for the calibration record. Floats are stored
//! as their bit pattern in a `u32` entry, so a torn write is impossible —
//! ESP-IDF NVS commits are atomic per `nvs_commit()`.
//!
//! On the host the same trait is backed by an in-memory map.

use log::info;

use crate::ports::{FloatStore, StorageError};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// NVS-backed float storage.
#[cfg(target_os = "espidf")]
pub struct NvsFloatStore {
    _private: (),
}

#[cfg(target_os = "espidf")]
impl NvsFloatStore {
    /// Initialise NVS flash and return the store.
    ///
    /// On first boot or after a version mismatch the partition is erased
    /// and re-initialised automatically.
    pub fn new() -> Result<Self, StorageError> {
        // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
        // single main-task context before any concurrent NVS access.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            log::warn!("NVS: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != ESP_OK {
                return Err(StorageError::IoError);
            }
            if unsafe { nvs_flash_init() } != ESP_OK {
                return Err(StorageError::IoError);
            }
        } else if ret != ESP_OK {
            return Err(StorageError::IoError);
        }
        info!("NvsFloatStore: ESP-IDF NVS initialised");
        Ok(Self { _private: () })
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

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

    fn key_buf(key: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let bytes = key.as_bytes();
        let len = bytes.len().min(15);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }
}

#[cfg(target_os = "espidf")]
impl FloatStore for NvsFloatStore {
    fn get_float(&self, namespace: &str, key: &str, default: f32) -> Result<f32, StorageError> {
        let key_buf = Self::key_buf(key);
        let result = Self::with_nvs_handle(namespace, false, |handle| {
            let mut bits: u32 = 0;
            let ret = unsafe { nvs_get_u32(handle, key_buf.as_ptr() as *const _, &mut bits) };
            if ret == ESP_OK {
                Ok(Some(f32::from_bits(bits)))
            } else if ret == ESP_ERR_NVS_NOT_FOUND {
                Ok(None)
            } else {
                Err(ret)
            }
        });
        match result {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(default),
            // A namespace that has never been written also reads as default.
            Err(ret) if ret == ESP_ERR_NVS_NOT_FOUND => Ok(default),
            Err(_) => Err(StorageError::IoError),
        }
    }

    fn put_float(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StorageError> {
        let key_buf = Self::key_buf(key);
        Self::with_nvs_handle(namespace, true, |handle| {
            let ret = unsafe { nvs_set_u32(handle, key_buf.as_ptr() as *const _, value.to_bits()) };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|ret| {
            if ret == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                StorageError::Full
            } else {
                StorageError::IoError
            }
        })
    }
}

/// In-memory float storage for host builds and tests.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimFloatStore {
    entries: HashMap<String, f32>,
}

#[cfg(not(target_os = "espidf"))]
impl SimFloatStore {
    pub fn new() -> Self {
        info!("SimFloatStore: in-memory backend");
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{namespace}::{key}")
    }
}

#[cfg(not(target_os = "espidf"))]
impl FloatStore for SimFloatStore {
    fn get_float(&self, namespace: &str, key: &str, default: f32) -> Result<f32, StorageError> {
        Ok(*self
            .entries
            .get(&Self::composite_key(namespace, key))
            .unwrap_or(&default))
    }

    fn put_float(&mut self, namespace: &str, key: &str, value: f32) -> Result<(), StorageError> {
        self.entries
            .insert(Self::composite_key(namespace, key), value);
        Ok(())
    }
}

/// The float store for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultFloatStore = NvsFloatStore;
#[cfg(not(target_os = "espidf"))]
pub type DefaultFloatStore = SimFloatStore;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_default() {
        let store = SimFloatStore::new();
        assert_eq!(store.get_float("aux", "offset", -1.0).unwrap(), -1.0);
    }

    #[test]
    fn namespaces_are_isolated() {
        let mut store = SimFloatStore::new();
        store.put_float("aux", "offset", 1850.0).unwrap();
        assert_eq!(store.get_float("aux", "offset", -1.0).unwrap(), 1850.0);
        assert_eq!(store.get_float("other", "offset", -1.0).unwrap(), -1.0);
    }

    #[test]
    fn put_overwrites_previous_value() {
        let mut store = SimFloatStore::new();
        store.put_float("aux", "sensitivity", 0.5).unwrap();
        store.put_float("aux", "sensitivity", 0.25).unwrap();
        assert_eq!(store.get_float("aux", "sensitivity", -1.0).unwrap(), 0.25);
    }
}
