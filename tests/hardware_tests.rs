//! Hardware enumeration integration tests.
//!
//! Builds a fake sysfs tree, an ids directory and driver configuration
//! databases in a temp dir, then runs the hardware service over them.

use std::fs;
use std::path::Path;

use control_panel_backend::config::HardwarePaths;
use control_panel_backend::hardware::MemoryDeviceLister;
use control_panel_backend::{
    DeviceLister, HardwareError, HardwareService, HwDevice, HwKind, SysfsDeviceLister,
};
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn write_attrs(dir: &Path, attrs: &[(&str, &str)]) {
    for (name, value) in attrs {
        write(&dir.join(name), &format!("{}\n", value));
    }
}

fn paths(root: &Path) -> HardwarePaths {
    HardwarePaths {
        usb_config_dir: root.join("mhwd/db/usb"),
        pci_config_dir: root.join("mhwd/db/pci"),
        usb_installed_dir: root.join("mhwd/local/usb"),
        pci_installed_dir: root.join("mhwd/local/pci"),
        sysfs_root: root.join("sys"),
        ids_dir: root.join("hwdata"),
    }
}

/// Hybrid laptop: Intel iGPU, NVIDIA dGPU, Intel NIC, one USB receiver.
fn laptop() -> TempDir {
    let root = TempDir::new().unwrap();
    let pci = root.path().join("sys/bus/pci/devices");
    write_attrs(
        &pci.join("0000:00:02.0"),
        &[("class", "0x030000"), ("vendor", "0x8086"), ("device", "0x3e9b")],
    );
    write_attrs(
        &pci.join("0000:01:00.0"),
        &[("class", "0x030200"), ("vendor", "0x10de"), ("device", "0x1f91")],
    );
    write_attrs(
        &pci.join("0000:00:1f.6"),
        &[("class", "0x020000"), ("vendor", "0x8086"), ("device", "0x15bb")],
    );

    let usb = root.path().join("sys/bus/usb/devices");
    write_attrs(
        &usb.join("1-3"),
        &[
            ("idVendor", "046d"),
            ("idProduct", "c534"),
            ("bDeviceClass", "00"),
            ("bDeviceSubClass", "00"),
        ],
    );
    write_attrs(
        &usb.join("1-3/1-3:1.0"),
        &[("bInterfaceClass", "03"), ("bInterfaceSubClass", "01")],
    );
    write_attrs(&usb.join("1-3:1.0"), &[("bInterfaceClass", "03")]);

    write(
        &root.path().join("hwdata/pci.ids"),
        "\
# pci.ids excerpt
8086  Intel Corporation
\t3e9b  CoffeeLake-H GT2 [UHD Graphics 630]
\t15bb  Ethernet Connection (7) I219-LM
10de  NVIDIA Corporation
\t1f91  TU117M [GeForce GTX 1650 Mobile / Max-Q]
C 03  Display controller
\t00  VGA compatible controller
\t02  3D controller
",
    );
    write(
        &root.path().join("hwdata/usb.ids"),
        "046d  Logitech, Inc.\n\tc534  Unifying Receiver\n",
    );

    let db = root.path().join("mhwd/db/pci");
    write(
        &db.join("graphic_drivers/video-linux/MHWDCONFIG"),
        "NAME=\"video-linux\"\nINFO=\"Free drivers\"\nPRIORITY=\"2\"\nCLASSIDS=\"0300 0302\"\nVENDORIDS=\"8086 10de 1002\"\n",
    );
    write(
        &db.join("graphic_drivers/video-hybrid-intel-nvidia/MHWDCONFIG"),
        "\
NAME=\"video-hybrid-intel-nvidia-prime\"
FREEDRIVER=\"false\"
PRIORITY=\"9\"
CLASSIDS=\"0300 0302\"
VENDORIDS=\"8086\"
CLASSIDS=\"0300 0302\"
VENDORIDS=\"10de\"
DEVICEIDS=\">nvidia.ids\"
MHWDDEPENDS=\"video-linux\"
",
    );
    write(
        &db.join("graphic_drivers/video-hybrid-intel-nvidia/nvidia.ids"),
        "# supported chips\n1f91 1f95\n",
    );
    write(
        &db.join("graphic_drivers/video-hybrid-amd-nvidia/MHWDCONFIG"),
        "NAME=\"video-hybrid-amd-nvidia-prime\"\nCLASSIDS=\"0300\"\nVENDORIDS=\"1002\"\nCLASSIDS=\"0302\"\nVENDORIDS=\"10de\"\n",
    );
    write(
        &db.join("network_drivers/broken/MHWDCONFIG"),
        "NAME=\"network-broken\"\nDEVICEIDS=\">missing.ids\"\n",
    );
    write(
        &root.path().join("mhwd/local/pci/video-linux/MHWDCONFIG"),
        "NAME=\"video-linux\"\nPRIORITY=\"2\"\nCLASSIDS=\"0300 0302\"\nVENDORIDS=\"8086 10de 1002\"\n",
    );
    root
}

fn by_bus_id<'a>(devices: &'a [HwDevice], bus_id: &str) -> &'a HwDevice {
    devices.iter().find(|d| d.sysfs_bus_id == bus_id).unwrap()
}

#[test]
fn test_pci_devices_with_configs() {
    let root = laptop();
    let mut service = HardwareService::from_paths(paths(root.path()));
    service.refresh().unwrap();

    let devices = service.pci_devices();
    assert_eq!(devices.len(), 3);

    let igpu = by_bus_id(devices, "0000:00:02.0");
    assert_eq!(igpu.class_id, "0300");
    assert_eq!(igpu.vendor_name, "Intel Corporation");
    assert_eq!(igpu.device_name, "CoffeeLake-H GT2 [UHD Graphics 630]");
    assert_eq!(igpu.class_name, "VGA compatible controller");
    assert_eq!(
        igpu.available_configs,
        vec!["video-hybrid-intel-nvidia-prime", "video-linux"]
    );
    assert_eq!(igpu.installed_configs, vec!["video-linux"]);

    let dgpu = by_bus_id(devices, "0000:01:00.0");
    assert_eq!(dgpu.class_id, "0302");
    assert_eq!(dgpu.class_name, "3D controller");
    assert_eq!(
        dgpu.available_configs,
        vec!["video-hybrid-intel-nvidia-prime", "video-linux"]
    );

    let nic = by_bus_id(devices, "0000:00:1f.6");
    assert!(nic.available_configs.is_empty());
    assert!(nic.installed_configs.is_empty());
}

#[test]
fn test_invalid_configs_are_reported_not_fatal() {
    let root = laptop();
    let mut service = HardwareService::from_paths(paths(root.path()));
    service.refresh().unwrap();

    let invalid = service.invalid_configs();
    assert_eq!(invalid.len(), 1);
    assert!(matches!(
        &invalid[0],
        HardwareError::InvalidConfig { path, .. } if path.contains("broken")
    ));

    let hybrid = service
        .configs(HwKind::Pci)
        .iter()
        .find(|c| c.name == "video-hybrid-intel-nvidia-prime")
        .unwrap();
    assert!(!hybrid.free_driver);
    assert_eq!(hybrid.groups.len(), 2);
    assert_eq!(hybrid.groups[1].ids.device_ids, vec!["1f91", "1f95"]);
    assert_eq!(hybrid.dependencies, vec!["video-linux"]);
    assert_eq!(service.installed_configs(HwKind::Pci).len(), 1);
}

#[test]
fn test_usb_device_uses_interface_class() {
    let root = laptop();
    let mut service = HardwareService::from_paths(paths(root.path()));
    service.refresh().unwrap();

    let devices = service.usb_devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].class_id, "0301");
    assert_eq!(devices[0].vendor_name, "Logitech, Inc.");
    assert_eq!(devices[0].device_name, "Unifying Receiver");
    assert!(devices[0].available_configs.is_empty());
}

#[test]
fn test_config_reload_without_reenumeration() {
    let root = laptop();
    let mut service = HardwareService::from_paths(paths(root.path()));
    service.refresh().unwrap();

    fs::remove_dir_all(root.path().join("mhwd/local/pci/video-linux")).unwrap();
    service.refresh_configs();

    let igpu = by_bus_id(service.pci_devices(), "0000:00:02.0");
    assert!(igpu.installed_configs.is_empty());
    assert_eq!(igpu.available_configs.len(), 2);
}

#[test]
fn test_sessions_release_on_every_path() {
    let root = laptop();
    let lister = SysfsDeviceLister::new(root.path().join("sys"));

    let session = lister.list_devices(HwKind::Pci).unwrap();
    assert_eq!(session.kind(), HwKind::Pci);
    assert_eq!(session.devices().unwrap().len(), 3);
    let devices = session.into_devices();
    assert_eq!(devices.len(), 3);

    let memory = MemoryDeviceLister::new(devices.clone(), devices);
    {
        let _usb = memory.list_devices(HwKind::Usb).unwrap();
        let _pci = memory.list_devices(HwKind::Pci).unwrap();
        assert_eq!(memory.open_sessions(), 2);
    }
    assert_eq!(memory.open_sessions(), 0);

    let mut session = memory.list_devices(HwKind::Usb).unwrap();
    session.close();
    session.close();
    assert!(session.is_closed());
    assert!(matches!(session.devices(), Err(HardwareError::SessionClosed)));
    assert_eq!(memory.open_sessions(), 0);
}

#[test]
fn test_missing_sysfs_bus_fails() {
    let root = TempDir::new().unwrap();
    let mut service = HardwareService::from_paths(paths(root.path()));
    assert!(matches!(
        service.refresh(),
        Err(HardwareError::BusUnavailable(_))
    ));
}
