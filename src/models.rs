//! Core data types for the control panel backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Suffix appended to a kernel package name to obtain its headers package.
pub const HEADERS_SUFFIX: &str = "-headers";

/// Name of a kernel package, e.g. `linux61` or `linux54-rt`.
///
/// Not validated against the kernel naming pattern: a name that matches no
/// repository package simply makes the transaction fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelPackageName(String);

impl KernelPackageName {
    pub fn new(name: impl Into<String>) -> Self {
        KernelPackageName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derive the kernel + headers pair for this name.
    pub fn pair(&self) -> PackagePair {
        PackagePair::for_kernel(self)
    }
}

impl fmt::Display for KernelPackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for KernelPackageName {
    fn from(s: &str) -> Self {
        KernelPackageName(s.to_string())
    }
}

impl From<String> for KernelPackageName {
    fn from(s: String) -> Self {
        KernelPackageName(s)
    }
}

/// A kernel package and its headers package, always handled together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackagePair {
    main: String,
    headers: String,
}

impl PackagePair {
    pub fn for_kernel(name: &KernelPackageName) -> Self {
        let mut headers = String::with_capacity(name.as_str().len() + HEADERS_SUFFIX.len());
        headers.push_str(name.as_str());
        headers.push_str(HEADERS_SUFFIX);

        PackagePair {
            main: name.as_str().to_string(),
            headers,
        }
    }

    pub fn main(&self) -> &str {
        &self.main
    }

    pub fn headers(&self) -> &str {
        &self.headers
    }

    /// Transaction targets in submission order: kernel first, then headers.
    pub fn into_targets(self) -> Vec<String> {
        vec![self.main, self.headers]
    }
}

/// Kind of package transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    Install,
    Remove,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Install => write!(f, "install"),
            TransactionKind::Remove => write!(f, "remove"),
        }
    }
}

/// Identifier assigned to each request by the lifecycle manager that built it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A package transaction ready for the engine. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    id: RequestId,
    kind: TransactionKind,
    targets: Vec<String>,
}

impl TransactionRequest {
    pub fn new(id: RequestId, kind: TransactionKind, targets: Vec<String>) -> Self {
        TransactionRequest { id, kind, targets }
    }

    /// Request covering a kernel and its headers.
    pub fn for_pair(id: RequestId, kind: TransactionKind, pair: PackagePair) -> Self {
        Self::new(id, kind, pair.into_targets())
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }
}

/// Final result of one transaction request, delivered exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionOutcome {
    pub id: RequestId,
    pub kind: TransactionKind,
    pub success: bool,
}

/// A kernel package found in the repository snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelCatalogEntry {
    pub name: String,
    pub version: String,
    pub installed: bool,
}

impl KernelCatalogEntry {
    pub fn new(name: impl Into<String>, version: impl Into<String>, installed: bool) -> Self {
        KernelCatalogEntry {
            name: name.into(),
            version: version.into(),
            installed,
        }
    }
}

/// A kernel as presented to the frontend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kernel {
    pub name: String,
    pub version: String,
    pub installed: bool,
    pub real_time: bool,
    pub experimental: bool,
    pub recommended: bool,
    pub lts: bool,
    /// Installed but no longer offered by any repository
    pub eol: bool,
    pub running: bool,
    pub installed_modules: Vec<String>,
}

/// Hardware bus category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HwKind {
    Usb,
    Pci,
}

impl fmt::Display for HwKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HwKind::Usb => write!(f, "usb"),
            HwKind::Pci => write!(f, "pci"),
        }
    }
}

impl std::str::FromStr for HwKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usb" => Ok(HwKind::Usb),
            "pci" => Ok(HwKind::Pci),
            other => Err(format!("unknown device kind '{}', expected usb or pci", other)),
        }
    }
}

/// A single enumerated device. Ids are lowercase hex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HwDevice {
    pub kind: Option<HwKind>,
    /// Base class and sub class, two hex digits each (e.g. `0300`)
    pub class_id: String,
    pub vendor_id: String,
    pub device_id: String,
    pub class_name: String,
    pub vendor_name: String,
    pub device_name: String,
    pub sysfs_bus_id: String,
    pub sysfs_id: String,
    /// Names of driver configs applicable to this device, by priority
    pub available_configs: Vec<String>,
    /// Names of driver configs already installed for this device, by priority
    pub installed_configs: Vec<String>,
}
