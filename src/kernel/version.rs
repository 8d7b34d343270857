//! Kernel package version parsing.
//!
//! Only `major.minor` matters for ordering kernels; the rest of a package
//! version (`6.1.12_1-2`, `5.4.0-rt`) is ignored.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
}

impl KernelVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        KernelVersion { major, minor }
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for KernelVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');

        let major_part = parts.next().unwrap_or_default();
        let major = major_part
            .parse::<u32>()
            .map_err(|e| format!("Invalid kernel major version in '{}': {}", s, e))?;

        let minor_part = parts
            .next()
            .ok_or_else(|| format!("Missing kernel minor version in '{}'", s))?;
        let digits: String = minor_part.chars().take_while(|c| c.is_ascii_digit()).collect();
        let minor = digits
            .parse::<u32>()
            .map_err(|e| format!("Invalid kernel minor version in '{}': {}", s, e))?;

        Ok(KernelVersion { major, minor })
    }
}

fn is_rt(version: &str) -> bool {
    version.contains("rt")
}

/// Ordering for kernel lists: newest `major.minor` first, and on equal
/// versions the plain kernel before its real-time variant. Versions that do
/// not parse go last.
pub fn newest_first(a: &str, b: &str) -> Ordering {
    match (a.parse::<KernelVersion>(), b.parse::<KernelVersion>()) {
        (Ok(va), Ok(vb)) => vb.cmp(&va).then_with(|| is_rt(a).cmp(&is_rt(b))),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}

/// Whether `check` sorts before `cmp` in a newest-first kernel list.
pub fn is_newer(check: &str, cmp: &str) -> bool {
    newest_first(check, cmp) == Ordering::Less
}
