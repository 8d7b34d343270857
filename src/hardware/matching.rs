//! Matching driver configurations to enumerated devices.

use crate::hardware::config::{HwConfig, HwIdGroup, ANY_ID};
use crate::models::HwDevice;

fn listed(ids: &[String], id: &str) -> bool {
    ids.iter().any(|candidate| candidate == ANY_ID || candidate == id)
}

fn blacklisted(ids: &[String], id: &str) -> bool {
    ids.iter().any(|candidate| candidate == id)
}

impl HwIdGroup {
    /// Whether `device` is covered by this group and not excluded by its
    /// blacklist.
    pub fn matches(&self, device: &HwDevice) -> bool {
        listed(&self.ids.class_ids, &device.class_id)
            && !blacklisted(&self.blacklist.class_ids, &device.class_id)
            && listed(&self.ids.vendor_ids, &device.vendor_id)
            && !blacklisted(&self.blacklist.vendor_ids, &device.vendor_id)
            && listed(&self.ids.device_ids, &device.device_id)
            && !blacklisted(&self.blacklist.device_ids, &device.device_id)
    }
}

/// Indices of the devices `config` applies to.
///
/// Every id group of the config must match at least one device; otherwise
/// the config applies to nothing. Indices are unique and ascending.
pub fn devices_of_config(devices: &[HwDevice], config: &HwConfig) -> Vec<usize> {
    let mut found = Vec::new();

    for group in &config.groups {
        let before = found.len();
        found.extend(
            devices
                .iter()
                .enumerate()
                .filter(|(_, device)| group.matches(device))
                .map(|(i, _)| i),
        );
        if found.len() == before {
            return Vec::new();
        }
    }

    found.sort_unstable();
    found.dedup();
    found
}

/// Insert `config` keeping `configs` ordered by descending priority.
///
/// A config whose name is already present is ignored; equal priorities keep
/// insertion order.
pub fn add_config_sorted<'a>(configs: &mut Vec<&'a HwConfig>, config: &'a HwConfig) {
    if configs.iter().any(|existing| existing.name == config.name) {
        return;
    }

    let position = configs
        .iter()
        .position(|existing| config.priority > existing.priority)
        .unwrap_or(configs.len());
    configs.insert(position, config);
}

/// Record, on each device, the names of the configs that apply to it.
///
/// Replaces the device's available (or, with `installed`, installed) config
/// list; names are ordered by descending priority.
pub fn attach_configs(devices: &mut [HwDevice], configs: &[HwConfig], installed: bool) {
    let mut per_device: Vec<Vec<&HwConfig>> = vec![Vec::new(); devices.len()];

    for config in configs {
        for index in devices_of_config(devices, config) {
            add_config_sorted(&mut per_device[index], config);
        }
    }

    for (device, matched) in devices.iter_mut().zip(per_device) {
        let names: Vec<String> = matched.iter().map(|c| c.name.clone()).collect();
        if installed {
            device.installed_configs = names;
        } else {
            device.available_configs = names;
        }
    }
}
