//! Reader for the `pci.ids` / `usb.ids` name databases shipped by hwdata.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::models::HwKind;

/// Vendor, device and class names keyed by lowercase hex ids.
#[derive(Debug, Clone, Default)]
pub struct IdsDatabase {
    vendors: HashMap<String, String>,
    devices: HashMap<(String, String), String>,
    classes: HashMap<String, String>,
    subclasses: HashMap<(String, String), String>,
}

enum Section {
    Vendor(String),
    Class(String),
    Other,
}

/// `"10de  NVIDIA Corporation"` -> `("10de", "NVIDIA Corporation")`
fn split_entry(body: &str) -> Option<(String, String)> {
    let (id, name) = body.split_once("  ")?;
    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some((id.to_lowercase(), name.trim().to_string()))
}

impl IdsDatabase {
    /// File name of the database for `kind`.
    pub fn file_name(kind: HwKind) -> &'static str {
        match kind {
            HwKind::Usb => "usb.ids",
            HwKind::Pci => "pci.ids",
        }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Load the database for `kind` from `dir`, or an empty one when it is
    /// missing.
    pub fn load_or_empty(dir: &Path, kind: HwKind) -> Self {
        let path = dir.join(Self::file_name(kind));
        match Self::load(&path) {
            Ok(db) => db,
            Err(e) => {
                log::debug!("[Hardware] No names from {}: {}", path.display(), e);
                IdsDatabase::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut db = IdsDatabase::default();
        let mut section = Section::Other;

        for line in content.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let depth = line.chars().take_while(|&c| c == '\t').count();
            let body = &line[depth..];

            match depth {
                0 => {
                    section = if let Some(rest) = body.strip_prefix("C ") {
                        match split_entry(rest) {
                            Some((id, name)) => {
                                db.classes.insert(id.clone(), name);
                                Section::Class(id)
                            }
                            None => Section::Other,
                        }
                    } else {
                        match split_entry(body) {
                            Some((id, name)) if id.len() == 4 => {
                                db.vendors.insert(id.clone(), name);
                                Section::Vendor(id)
                            }
                            _ => Section::Other,
                        }
                    };
                }
                1 => {
                    let Some((id, name)) = split_entry(body) else {
                        continue;
                    };
                    match &section {
                        Section::Vendor(vendor) => {
                            db.devices.insert((vendor.clone(), id), name);
                        }
                        Section::Class(class) => {
                            db.subclasses.insert((class.clone(), id), name);
                        }
                        Section::Other => {}
                    }
                }
                // subsystems, interfaces and protocols
                _ => {}
            }
        }

        db
    }

    pub fn vendor_name(&self, vendor_id: &str) -> Option<&str> {
        self.vendors.get(vendor_id).map(String::as_str)
    }

    pub fn device_name(&self, vendor_id: &str, device_id: &str) -> Option<&str> {
        self.devices
            .get(&(vendor_id.to_string(), device_id.to_string()))
            .map(String::as_str)
    }

    /// Name for a 4 digit class id: the sub class name when known, else the
    /// base class name.
    pub fn class_name(&self, class_id: &str) -> Option<&str> {
        if class_id.len() != 4 {
            return None;
        }
        let (base, sub) = class_id.split_at(2);
        self.subclasses
            .get(&(base.to_string(), sub.to_string()))
            .or_else(|| self.classes.get(base))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty() && self.classes.is_empty()
    }
}
