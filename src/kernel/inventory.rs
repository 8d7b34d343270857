//! Kernel inventory: merges the repository snapshot, the installed packages
//! and the running kernel into the list shown to the user.

use crate::catalog::{is_kernel_package, InstalledPackages};
use crate::kernel::version::{newest_first, KernelVersion};
use crate::models::{Kernel, KernelCatalogEntry};
use crate::system::command::run_captured;

/// Kernels suggested to users.
pub const RECOMMENDED_KERNELS: &[&str] = &[
    "linux414", "linux419", "linux54", "linux510", "linux515", "linux61", "linux66",
];

/// Long term support series.
pub const LTS_KERNELS: &[&str] = &[
    "linux310",
    "linux312",
    "linux314",
    "linux316",
    "linux318",
    "linux41",
    "linux44",
    "linux49",
    "linux414",
    "linux414-rt",
    "linux419",
    "linux419-rt",
    "linux54",
    "linux510",
    "linux515",
    "linux61",
    "linux66",
];

/// The kernel the system is booted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningKernel {
    pub version: KernelVersion,
    pub real_time: bool,
}

impl RunningKernel {
    /// Parse a kernel release string such as `6.1.12-1-MANJARO` or
    /// `5.4.0-rt1-MANJARO`.
    pub fn from_release(release: &str) -> Option<Self> {
        let release = release.trim();
        let version = release.parse::<KernelVersion>().ok()?;
        Some(RunningKernel {
            version,
            real_time: release.contains("-rt"),
        })
    }

    fn matches(&self, kernel: &Kernel) -> bool {
        kernel
            .version
            .parse::<KernelVersion>()
            .map(|v| v == self.version && kernel.real_time == self.real_time)
            .unwrap_or(false)
    }
}

/// Detect the running kernel with `uname -r`.
pub fn detect_running_kernel() -> Option<RunningKernel> {
    let output = match run_captured("uname", &["-r"]) {
        Ok(output) if output.success() => output,
        Ok(output) => {
            crate::log_command_failure!("Kernel", "uname -r", output);
            return None;
        }
        Err(e) => {
            log::error!("[Kernel] Failed to get running kernel: {}", e);
            return None;
        }
    };

    let running = RunningKernel::from_release(&output.stdout);
    if running.is_none() {
        log::warn!("[Kernel] Unexpected kernel release format: {}", output.stdout.trim());
    }
    running
}

fn describe(name: &str, version: &str, installed: bool) -> Kernel {
    Kernel {
        name: name.to_string(),
        version: version.to_string(),
        installed,
        real_time: name.contains("rt"),
        experimental: name.contains("rc"),
        recommended: RECOMMENDED_KERNELS.contains(&name),
        lts: LTS_KERNELS.contains(&name),
        ..Kernel::default()
    }
}

/// Owner of a module package: the installed kernel with the longest name
/// that prefixes `module` followed by a dash.
fn module_owner(module: &str, kernels: &[Kernel]) -> Option<usize> {
    kernels
        .iter()
        .enumerate()
        .filter(|(_, k)| k.installed)
        .filter(|(_, k)| {
            module
                .strip_prefix(k.name.as_str())
                .map_or(false, |rest| rest.starts_with('-'))
        })
        .max_by_key(|(_, k)| k.name.len())
        .map(|(i, _)| i)
}

/// Build the kernel list.
///
/// - every repository kernel is listed
/// - installed kernels no repository offers are added as end of life
/// - other installed packages are modules, attached to their kernel
/// - the result is ordered newest first
pub fn build_inventory(
    repo: &[KernelCatalogEntry],
    installed: &InstalledPackages,
    running: Option<&RunningKernel>,
) -> Vec<Kernel> {
    let mut kernels: Vec<Kernel> = repo
        .iter()
        .map(|entry| describe(&entry.name, &entry.version, entry.installed))
        .collect();

    let mut modules = Vec::new();
    for (name, version) in installed {
        if !is_kernel_package(name) {
            modules.push(name.as_str());
            continue;
        }

        match kernels.iter_mut().find(|k| &k.name == name) {
            Some(kernel) => kernel.installed = true,
            None => {
                log::debug!("[Kernel] {} {} is installed but not in any repository", name, version);
                let mut kernel = describe(name, version, true);
                kernel.eol = true;
                kernels.push(kernel);
            }
        }
    }

    for module in modules {
        match module_owner(module, &kernels) {
            Some(i) => kernels[i].installed_modules.push(module.to_string()),
            None => log::debug!("[Kernel] No installed kernel owns {}", module),
        }
    }

    if let Some(running) = running {
        for kernel in kernels.iter_mut() {
            kernel.running = running.matches(kernel);
        }
    }

    kernels.sort_by(|a, b| newest_first(&a.version, &b.version).then_with(|| a.name.cmp(&b.name)));
    kernels
}
