//! Hardware service: device lists with their available and installed driver
//! configurations.

use crate::config::HardwarePaths;
use crate::error::HardwareError;
use crate::hardware::config::{load_configs, HwConfig};
use crate::hardware::matching::attach_configs;
use crate::hardware::sysfs::SysfsDeviceLister;
use crate::hardware::DeviceLister;
use crate::models::{HwDevice, HwKind};

#[derive(Debug, Default)]
struct BusState {
    devices: Vec<HwDevice>,
    available: Vec<HwConfig>,
    installed: Vec<HwConfig>,
}

pub struct HardwareService {
    lister: Box<dyn DeviceLister>,
    paths: HardwarePaths,
    usb: BusState,
    pci: BusState,
    invalid_configs: Vec<HardwareError>,
}

impl HardwareService {
    pub fn new(lister: Box<dyn DeviceLister>, paths: HardwarePaths) -> Self {
        HardwareService {
            lister,
            paths,
            usb: BusState::default(),
            pci: BusState::default(),
            invalid_configs: Vec::new(),
        }
    }

    /// Service over sysfs using the configured locations.
    pub fn from_paths(paths: HardwarePaths) -> Self {
        let lister = SysfsDeviceLister::new(&paths.sysfs_root).with_ids_dir(&paths.ids_dir);
        Self::new(Box::new(lister), paths)
    }

    fn bus(&self, kind: HwKind) -> &BusState {
        match kind {
            HwKind::Usb => &self.usb,
            HwKind::Pci => &self.pci,
        }
    }

    fn bus_mut(&mut self, kind: HwKind) -> &mut BusState {
        match kind {
            HwKind::Usb => &mut self.usb,
            HwKind::Pci => &mut self.pci,
        }
    }

    /// Re-enumerate devices and reload every configuration.
    pub fn refresh(&mut self) -> Result<(), HardwareError> {
        self.refresh_devices()?;
        self.refresh_configs();
        Ok(())
    }

    /// Re-enumerate both buses. Config lists on the devices are rebuilt from
    /// the configs already loaded.
    pub fn refresh_devices(&mut self) -> Result<(), HardwareError> {
        for kind in [HwKind::Pci, HwKind::Usb] {
            let devices = self.lister.devices(kind)?;
            let bus = self.bus_mut(kind);
            bus.devices = devices;
            attach_configs(&mut bus.devices, &bus.available, false);
            attach_configs(&mut bus.devices, &bus.installed, true);
        }
        Ok(())
    }

    /// Reload the available and installed driver configurations and match
    /// them against the current devices.
    pub fn refresh_configs(&mut self) {
        self.invalid_configs.clear();

        for kind in [HwKind::Pci, HwKind::Usb] {
            let (config_dir, installed_dir) = match kind {
                HwKind::Usb => (&self.paths.usb_config_dir, &self.paths.usb_installed_dir),
                HwKind::Pci => (&self.paths.pci_config_dir, &self.paths.pci_installed_dir),
            };
            let (available, mut invalid) = load_configs(config_dir, kind);
            let (installed, invalid_installed) = load_configs(installed_dir, kind);
            invalid.extend(invalid_installed);

            let bus = self.bus_mut(kind);
            bus.available = available;
            bus.installed = installed;
            attach_configs(&mut bus.devices, &bus.available, false);
            attach_configs(&mut bus.devices, &bus.installed, true);

            crate::log_info!(
                "[Hardware] {}: {} configs available, {} installed",
                kind,
                self.bus(kind).available.len(),
                self.bus(kind).installed.len()
            );
            self.invalid_configs.extend(invalid);
        }
    }

    pub fn devices(&self, kind: HwKind) -> &[HwDevice] {
        &self.bus(kind).devices
    }

    pub fn usb_devices(&self) -> &[HwDevice] {
        self.devices(HwKind::Usb)
    }

    pub fn pci_devices(&self) -> &[HwDevice] {
        self.devices(HwKind::Pci)
    }

    /// Configs that can be installed for `kind`.
    pub fn configs(&self, kind: HwKind) -> &[HwConfig] {
        &self.bus(kind).available
    }

    pub fn installed_configs(&self, kind: HwKind) -> &[HwConfig] {
        &self.bus(kind).installed
    }

    /// Configs that failed to parse during the last reload.
    pub fn invalid_configs(&self) -> &[HardwareError] {
        &self.invalid_configs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MemoryDeviceLister;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn paths(root: &Path) -> HardwarePaths {
        HardwarePaths {
            usb_config_dir: root.join("db/usb"),
            pci_config_dir: root.join("db/pci"),
            usb_installed_dir: root.join("local/usb"),
            pci_installed_dir: root.join("local/pci"),
            sysfs_root: root.join("sys"),
            ids_dir: root.join("hwdata"),
        }
    }

    fn gpu() -> HwDevice {
        HwDevice {
            kind: Some(HwKind::Pci),
            class_id: "0300".to_string(),
            vendor_id: "10de".to_string(),
            device_id: "1c82".to_string(),
            ..HwDevice::default()
        }
    }

    #[test]
    fn test_refresh_attaches_configs() {
        let root = TempDir::new().unwrap();
        write(
            &root.path().join("db/pci/nvidia/MHWDCONFIG"),
            "NAME=video-nvidia\nPRIORITY=8\nCLASSIDS=0300\nVENDORIDS=10de\n",
        );
        write(
            &root.path().join("db/pci/vesa/MHWDCONFIG"),
            "NAME=video-vesa\nCLASSIDS=0300\n",
        );
        write(&root.path().join("db/pci/broken/MHWDCONFIG"), "CLASSIDS=0300\n");
        write(
            &root.path().join("local/pci/vesa/MHWDCONFIG"),
            "NAME=video-vesa\nCLASSIDS=0300\n",
        );

        let lister = MemoryDeviceLister::new(vec![], vec![gpu()]);
        let mut service = HardwareService::new(Box::new(lister), paths(root.path()));
        service.refresh().unwrap();

        let gpu = &service.pci_devices()[0];
        assert_eq!(gpu.available_configs, vec!["video-nvidia", "video-vesa"]);
        assert_eq!(gpu.installed_configs, vec!["video-vesa"]);
        assert_eq!(service.configs(HwKind::Pci).len(), 2);
        assert_eq!(service.invalid_configs().len(), 1);
        assert!(service.usb_devices().is_empty());
    }

    #[test]
    fn test_unavailable_bus_fails_refresh() {
        let root = TempDir::new().unwrap();
        let lister = MemoryDeviceLister::new(vec![], vec![gpu()]);
        lister.set_unavailable(HwKind::Usb);

        let mut service = HardwareService::new(Box::new(lister), paths(root.path()));
        assert!(matches!(
            service.refresh(),
            Err(HardwareError::BusUnavailable(_))
        ));
    }

    #[test]
    fn test_missing_databases_give_no_configs() {
        let root = TempDir::new().unwrap();
        let lister = MemoryDeviceLister::new(vec![], vec![gpu()]);
        let mut service = HardwareService::new(Box::new(lister), paths(root.path()));
        service.refresh().unwrap();

        assert!(service.pci_devices()[0].available_configs.is_empty());
        assert!(service.invalid_configs().is_empty());
    }
}
