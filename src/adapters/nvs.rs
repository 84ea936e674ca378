//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`RecordStorePort`] for the event record slot.
//!
//! - **`target_os = "espidf"`**: raw `nvs_open` / `nvs_get_str` /
//!   `nvs_set_str` / `nvs_commit` / `nvs_close` on the default partition.
//! - **all other targets**: in-memory simulation.  Writes are staged in the
//!   session and only become visible after `commit()`.

use crate::app::ports::{RecordSession, RecordStorePort, StorageError};
use log::info;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::warn;

/// Namespace and key names are limited to 15 bytes by NVS.
pub const MAX_NAME_LEN: usize = 15;

pub struct NvsRecordStore {
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, String>,
}

impl NvsRecordStore {
    /// Initialise NVS flash.
    ///
    /// If the partition has no free pages or was written by a newer NVS
    /// version it is erased and re-initialised once.  Any remaining failure
    /// is returned and must abort startup.
    pub fn init() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(StorageError::Io(ret2));
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(StorageError::Io(ret3));
                }
            } else if ret != ESP_OK {
                return Err(StorageError::Io(ret));
            }
            info!("NvsRecordStore: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsRecordStore: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        })
    }
}

/// NUL-terminate a namespace/key name into a fixed buffer.
fn c_name(name: &str) -> Result<[u8; MAX_NAME_LEN + 1], StorageError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_NAME_LEN || bytes.contains(&0) {
        return Err(StorageError::TooLong);
    }
    let mut buf = [0u8; MAX_NAME_LEN + 1];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF session
// ───────────────────────────────────────────────────────────────

/// Open read-write handle; closed on drop.
#[cfg(target_os = "espidf")]
pub struct NvsSession {
    handle: nvs_handle_t,
}

#[cfg(target_os = "espidf")]
impl Drop for NvsSession {
    fn drop(&mut self) {
        // SAFETY: handle came from a successful nvs_open and is closed once.
        unsafe { nvs_close(self.handle) };
    }
}

#[cfg(target_os = "espidf")]
impl RecordStorePort for NvsRecordStore {
    type Session<'a> = NvsSession;

    fn open(&mut self, namespace: &str) -> Result<NvsSession, StorageError> {
        let ns = c_name(namespace)?;
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe {
            nvs_open(ns.as_ptr() as *const _, nvs_open_mode_t_NVS_READWRITE, &mut handle)
        };
        if ret != ESP_OK {
            return Err(StorageError::Io(ret));
        }
        Ok(NvsSession { handle })
    }
}

#[cfg(target_os = "espidf")]
impl RecordSession for NvsSession {
    fn get_string<'b>(&mut self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b str>, StorageError> {
        let k = c_name(key)?;
        let mut len = buf.len();
        let ret = unsafe {
            nvs_get_str(self.handle, k.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut len)
        };
        match ret {
            ESP_OK => {}
            ESP_ERR_NVS_NOT_FOUND => return Ok(None),
            ESP_ERR_NVS_INVALID_LENGTH => return Err(StorageError::TooLong),
            other => return Err(StorageError::Io(other)),
        }
        // `len` includes the terminating NUL.
        let text = &buf[..len.saturating_sub(1)];
        core::str::from_utf8(text)
            .map(Some)
            .map_err(|_| StorageError::Io(ESP_FAIL))
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let k = c_name(key)?;
        let v = std::ffi::CString::new(value).map_err(|_| StorageError::Io(ESP_ERR_INVALID_ARG))?;
        let ret = unsafe { nvs_set_str(self.handle, k.as_ptr() as *const _, v.as_ptr()) };
        if ret != ESP_OK {
            return Err(StorageError::Io(ret));
        }
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        let ret = unsafe { nvs_commit(self.handle) };
        if ret != ESP_OK {
            return Err(StorageError::Io(ret));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation session
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct SimSession<'a> {
    store: &'a mut HashMap<String, String>,
    namespace: String,
    staged: Vec<(String, String)>,
}

#[cfg(not(target_os = "espidf"))]
impl NvsRecordStore {
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Committed value of `namespace`/`key` (test inspection).
    pub fn committed(&self, namespace: &str, key: &str) -> Option<&str> {
        self.store.get(&Self::composite_key(namespace, key)).map(String::as_str)
    }
}

#[cfg(not(target_os = "espidf"))]
impl RecordStorePort for NvsRecordStore {
    type Session<'a> = SimSession<'a>;

    fn open(&mut self, namespace: &str) -> Result<SimSession<'_>, StorageError> {
        c_name(namespace)?;
        Ok(SimSession {
            store: &mut self.store,
            namespace: namespace.to_owned(),
            staged: Vec::new(),
        })
    }
}

#[cfg(not(target_os = "espidf"))]
impl RecordSession for SimSession<'_> {
    fn get_string<'b>(&mut self, key: &str, buf: &'b mut [u8]) -> Result<Option<&'b str>, StorageError> {
        c_name(key)?;
        let composite = NvsRecordStore::composite_key(&self.namespace, key);
        match self.store.get(&composite) {
            Some(value) => {
                // Leave room for the terminating NUL, as NVS does.
                if value.len() + 1 > buf.len() {
                    return Err(StorageError::TooLong);
                }
                let n = value.len();
                buf[..n].copy_from_slice(value.as_bytes());
                core::str::from_utf8(&buf[..n])
                    .map(Some)
                    .map_err(|_| StorageError::Io(0))
            }
            None => Ok(None),
        }
    }

    fn set_string(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        c_name(key)?;
        self.staged.push((key.to_owned(), value.to_owned()));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        for (key, value) in self.staged.drain(..) {
            let composite = NvsRecordStore::composite_key(&self.namespace, &key);
            self.store.insert(composite, value);
        }
        Ok(())
    }
}
