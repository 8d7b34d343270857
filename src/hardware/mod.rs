//! Hardware enumeration public API module.
//!
//! Lists USB and PCI devices and matches them against the driver
//! configuration database.
//!
//! Enumeration is scoped: [`DeviceLister::list_devices`] returns an
//! [`EnumerationSession`] that owns whatever backing context the lister
//! needed, and releases it when the session is closed or dropped.

pub mod config;
pub mod ids;
pub mod matching;
pub mod service;
pub mod sysfs;

pub use config::{find_config_files, load_configs, parse_config_file, HwConfig, HwIdGroup, HwIds};
pub use ids::IdsDatabase;
pub use matching::{add_config_sorted, attach_configs, devices_of_config};
pub use service::HardwareService;
pub use sysfs::SysfsDeviceLister;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::HardwareError;
use crate::models::{HwDevice, HwKind};

/// Device enumeration backend.
pub trait DeviceLister: Send + Sync {
    /// Enumerate all devices of `kind`.
    fn list_devices(&self, kind: HwKind) -> Result<EnumerationSession, HardwareError>;

    /// Enumerate and release immediately, keeping only the records.
    fn devices(&self, kind: HwKind) -> Result<Vec<HwDevice>, HardwareError> {
        Ok(self.list_devices(kind)?.into_devices())
    }
}

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Devices of one enumeration plus the context backing them.
pub struct EnumerationSession {
    kind: HwKind,
    devices: Vec<HwDevice>,
    release: Option<ReleaseFn>,
    closed: bool,
}

impl EnumerationSession {
    /// Session with no backing context to release.
    pub fn new(kind: HwKind, devices: Vec<HwDevice>) -> Self {
        EnumerationSession {
            kind,
            devices,
            release: None,
            closed: false,
        }
    }

    /// Session whose context is released by `release`, exactly once.
    pub fn with_release(
        kind: HwKind,
        devices: Vec<HwDevice>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        EnumerationSession {
            kind,
            devices,
            release: Some(Box::new(release)),
            closed: false,
        }
    }

    pub fn kind(&self) -> HwKind {
        self.kind
    }

    pub fn devices(&self) -> Result<&[HwDevice], HardwareError> {
        if self.closed {
            return Err(HardwareError::SessionClosed);
        }
        Ok(&self.devices)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Take the records and release the context.
    pub fn into_devices(mut self) -> Vec<HwDevice> {
        let devices = std::mem::take(&mut self.devices);
        self.close();
        devices
    }

    /// Release the context early. Further calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.devices.clear();
        if let Some(release) = self.release.take() {
            release();
        }
        log::debug!("[Hardware] {} enumeration session released", self.kind);
    }
}

impl Drop for EnumerationSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for EnumerationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumerationSession")
            .field("kind", &self.kind)
            .field("devices", &self.devices.len())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Lister over fixed device records.
///
/// Counts open sessions so callers can check that every session is
/// released.
#[derive(Debug, Default)]
pub struct MemoryDeviceLister {
    usb: Vec<HwDevice>,
    pci: Vec<HwDevice>,
    unavailable: Mutex<Vec<HwKind>>,
    open_sessions: Arc<AtomicUsize>,
}

impl MemoryDeviceLister {
    pub fn new(usb: Vec<HwDevice>, pci: Vec<HwDevice>) -> Self {
        MemoryDeviceLister {
            usb,
            pci,
            ..Self::default()
        }
    }

    /// Make enumeration of `kind` fail.
    pub fn set_unavailable(&self, kind: HwKind) {
        if let Ok(mut unavailable) = self.unavailable.lock() {
            unavailable.push(kind);
        }
    }

    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

impl DeviceLister for MemoryDeviceLister {
    fn list_devices(&self, kind: HwKind) -> Result<EnumerationSession, HardwareError> {
        let unavailable = self
            .unavailable
            .lock()
            .map(|u| u.contains(&kind))
            .unwrap_or(true);
        if unavailable {
            return Err(HardwareError::BusUnavailable(format!("{} bus is unavailable", kind)));
        }

        let devices = match kind {
            HwKind::Usb => self.usb.clone(),
            HwKind::Pci => self.pci.clone(),
        };

        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        let open_sessions = Arc::clone(&self.open_sessions);
        Ok(EnumerationSession::with_release(kind, devices, move || {
            open_sessions.fetch_sub(1, Ordering::SeqCst);
        }))
    }
}
