//! Device enumeration from sysfs.
//!
//! PCI devices come from `<root>/bus/pci/devices/*` (`class`, `vendor`,
//! `device` attributes), USB devices from `<root>/bus/usb/devices/*`
//! (`idVendor`, `idProduct`, `bDeviceClass`, `bDeviceSubClass`). USB interface
//! entries (`1-1:1.0`) are not devices and are skipped.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HardwareError;
use crate::hardware::ids::IdsDatabase;
use crate::hardware::{DeviceLister, EnumerationSession};
use crate::models::{HwDevice, HwKind};

/// Lister reading sysfs under a configurable root (normally `/sys`).
#[derive(Debug, Clone)]
pub struct SysfsDeviceLister {
    root: PathBuf,
    ids_dir: Option<PathBuf>,
}

impl SysfsDeviceLister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SysfsDeviceLister {
            root: root.into(),
            ids_dir: None,
        }
    }

    /// Resolve names from the `pci.ids`/`usb.ids` files in `dir`.
    pub fn with_ids_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ids_dir = Some(dir.into());
        self
    }

    fn bus_dir(&self, kind: HwKind) -> PathBuf {
        self.root.join("bus").join(kind.to_string()).join("devices")
    }

    fn sysfs_id(&self, entry: &Path) -> String {
        let resolved = fs::canonicalize(entry).unwrap_or_else(|_| entry.to_path_buf());
        let root = fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        match resolved.strip_prefix(&root) {
            Ok(relative) => format!("/{}", relative.display()),
            Err(_) => resolved.display().to_string(),
        }
    }

    fn read_pci_device(&self, entry: &Path) -> Option<HwDevice> {
        let class = parse_hex(&read_attr(entry, "class")?)?;
        let vendor = parse_hex(&read_attr(entry, "vendor")?)?;
        let device = parse_hex(&read_attr(entry, "device")?)?;

        // class is 0xBBSSPP: base class, sub class, programming interface
        Some(HwDevice {
            kind: Some(HwKind::Pci),
            class_id: format!("{:02x}{:02x}", (class >> 16) & 0xff, (class >> 8) & 0xff),
            vendor_id: format!("{:04x}", vendor),
            device_id: format!("{:04x}", device),
            sysfs_bus_id: file_name(entry),
            sysfs_id: self.sysfs_id(entry),
            ..HwDevice::default()
        })
    }

    fn read_usb_device(&self, entry: &Path) -> Option<HwDevice> {
        let name = file_name(entry);
        if name.contains(':') {
            return None;
        }

        let vendor = parse_hex(&read_attr(entry, "idVendor")?)?;
        let product = parse_hex(&read_attr(entry, "idProduct")?)?;
        let mut class = read_attr(entry, "bDeviceClass").and_then(|c| parse_hex(&c)).unwrap_or(0);
        let mut sub_class = read_attr(entry, "bDeviceSubClass")
            .and_then(|c| parse_hex(&c))
            .unwrap_or(0);

        // Class 00 means "defined per interface": use the first interface
        if class == 0 {
            let interface = entry.join(format!("{}:1.0", name));
            if let Some(c) = read_attr(&interface, "bInterfaceClass").and_then(|c| parse_hex(&c)) {
                class = c;
                sub_class = read_attr(&interface, "bInterfaceSubClass")
                    .and_then(|c| parse_hex(&c))
                    .unwrap_or(0);
            }
        }

        Some(HwDevice {
            kind: Some(HwKind::Usb),
            class_id: format!("{:02x}{:02x}", class & 0xff, sub_class & 0xff),
            vendor_id: format!("{:04x}", vendor),
            device_id: format!("{:04x}", product),
            vendor_name: read_attr(entry, "manufacturer").unwrap_or_default(),
            device_name: read_attr(entry, "product").unwrap_or_default(),
            sysfs_bus_id: name,
            sysfs_id: self.sysfs_id(entry),
            ..HwDevice::default()
        })
    }
}

impl Default for SysfsDeviceLister {
    fn default() -> Self {
        Self::new("/sys").with_ids_dir("/usr/share/hwdata")
    }
}

impl DeviceLister for SysfsDeviceLister {
    fn list_devices(&self, kind: HwKind) -> Result<EnumerationSession, HardwareError> {
        let bus_dir = self.bus_dir(kind);
        let entries = fs::read_dir(&bus_dir).map_err(|e| {
            HardwareError::BusUnavailable(format!("{}: {}", bus_dir.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();

        let ids = self
            .ids_dir
            .as_deref()
            .map(|dir| IdsDatabase::load_or_empty(dir, kind))
            .unwrap_or_default();

        let mut devices = Vec::new();
        for path in &paths {
            let device = match kind {
                HwKind::Pci => self.read_pci_device(path),
                HwKind::Usb => self.read_usb_device(path),
            };
            match device {
                Some(mut device) => {
                    apply_names(&mut device, &ids);
                    devices.push(device);
                }
                None => log::debug!("[Hardware] Skipping {}", path.display()),
            }
        }

        log::info!("[Hardware] Enumerated {} {} devices", devices.len(), kind);
        Ok(EnumerationSession::new(kind, devices))
    }
}

fn apply_names(device: &mut HwDevice, ids: &IdsDatabase) {
    if let Some(name) = ids.class_name(&device.class_id) {
        device.class_name = name.to_string();
    }
    if let Some(name) = ids.vendor_name(&device.vendor_id) {
        device.vendor_name = name.to_string();
    }
    if let Some(name) = ids.device_name(&device.vendor_id, &device.device_id) {
        device.device_name = name.to_string();
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn read_attr(dir: &Path, attr: &str) -> Option<String> {
    fs::read_to_string(dir.join(attr))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse `0x10de` or `10de`.
fn parse_hex(value: &str) -> Option<u32> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u32::from_str_radix(digits, 16).ok()
}
