//! control-panel-backend: command line front for the backend services.
//!
//! ```text
//! control-panel-backend [--json] [--verbose] kernels
//! control-panel-backend [--verbose] install <kernel>
//! control-panel-backend [--verbose] remove <kernel>
//! control-panel-backend [--json] [--verbose] devices usb|pci
//! control-panel-backend [--json] [--verbose] language-packs
//! ```

use std::io::{self, Write};
use std::sync::Arc;

use control_panel_backend::config::{get_settings_path, load_settings, BackendSettings};
use control_panel_backend::{
    detect_language_packs, init_logging, AppError, HardwareService, HwKind,
    KernelLifecycleManager, KernelService, LogSink, PackageCatalog, PacmanCatalog, PacmanEngine,
};

const USAGE: &str = "\
Usage: control-panel-backend [--json] [--verbose] <command>

Commands:
  kernels              List available and installed kernels
  install <kernel>     Install a kernel and its headers
  remove <kernel>      Remove a kernel and its headers
  devices usb|pci      List devices with their driver configurations
  language-packs       List language packs for installed applications";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Kernels,
    Install(String),
    Remove(String),
    Devices(HwKind),
    LanguagePacks,
}

#[derive(Debug, PartialEq, Eq)]
struct Cli {
    command: Command,
    json: bool,
    verbose: bool,
}

impl Cli {
    fn parse(args: &[String]) -> Result<Cli, String> {
        let mut json = false;
        let mut verbose = false;
        let mut positional = Vec::new();

        for arg in args {
            match arg.as_str() {
                "--json" => json = true,
                "-v" | "--verbose" => verbose = true,
                flag if flag.starts_with('-') => return Err(format!("Unknown option '{}'", flag)),
                value => positional.push(value),
            }
        }

        let command = match positional.as_slice() {
            ["kernels"] => Command::Kernels,
            ["install", name] => Command::Install(name.to_string()),
            ["remove", name] => Command::Remove(name.to_string()),
            ["devices", kind] => Command::Devices(kind.parse()?),
            ["language-packs"] => Command::LanguagePacks,
            [] => return Err("No command given".to_string()),
            other => return Err(format!("Unrecognized command '{}'", other.join(" "))),
        };

        Ok(Cli {
            command,
            json,
            verbose,
        })
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{}", USAGE);
        return;
    }

    let cli = match Cli::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> control_panel_backend::Result<()> {
    let settings_path = get_settings_path()?;
    let settings = load_settings(&settings_path)?;

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        settings.level_filter()?
    };
    let collector = init_logging(settings.log_dir.as_deref(), level).map_err(AppError::Logging)?;
    log::info!("[Main] control-panel-backend {}", control_panel_backend::VERSION);

    let result = match &cli.command {
        Command::Kernels => list_kernels(&settings, cli.json).await,
        Command::Install(name) => run_transaction(&settings, name, true).await,
        Command::Remove(name) => run_transaction(&settings, name, false).await,
        Command::Devices(kind) => list_devices(&settings, *kind, cli.json).await,
        Command::LanguagePacks => list_language_packs(cli.json).await,
    };

    if let Err(e) = collector.wait_for_empty().await {
        eprintln!("[Main] WARNING: Failed to flush logs: {}", e);
    }
    result
}

async fn list_kernels(settings: &BackendSettings, json: bool) -> control_panel_backend::Result<()> {
    // pacman runs synchronously; keep it off the runtime threads
    let catalog = tokio::task::spawn_blocking(|| {
        let mut catalog = PacmanCatalog::open()?;
        catalog.refresh()?;
        Ok::<_, control_panel_backend::CatalogError>(catalog)
    })
    .await??;

    let engine = Arc::new(PacmanEngine::new(settings.privilege_helper()));
    let service = KernelService::new(Box::new(catalog), engine, Arc::new(LogSink))?;
    let kernels = service.kernels()?;
    service.shutdown().await;

    let mut out = io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&kernels)?)?;
        return Ok(());
    }

    for kernel in &kernels {
        let mut flags = Vec::new();
        if kernel.running {
            flags.push("running");
        }
        if kernel.installed {
            flags.push("installed");
        }
        if kernel.recommended {
            flags.push("recommended");
        }
        if kernel.lts {
            flags.push("lts");
        }
        if kernel.real_time {
            flags.push("rt");
        }
        if kernel.experimental {
            flags.push("experimental");
        }
        if kernel.eol {
            flags.push("eol");
        }
        writeln!(out, "{:<14} {:<20} {}", kernel.name, kernel.version, flags.join(" "))?;
        if !kernel.installed_modules.is_empty() {
            writeln!(out, "{:<14} modules: {}", "", kernel.installed_modules.join(", "))?;
        }
    }
    Ok(())
}

async fn run_transaction(
    settings: &BackendSettings,
    name: &str,
    install: bool,
) -> control_panel_backend::Result<()> {
    let engine = Arc::new(PacmanEngine::new(settings.privilege_helper()));
    let manager = KernelLifecycleManager::new(engine, Arc::new(LogSink));

    let pending = if install {
        manager.install_kernel(name)?
    } else {
        manager.remove_kernel(name)?
    };
    let outcome = pending.wait().await;
    manager.shutdown().await;

    if !outcome.success {
        return Err(AppError::TransactionFailed {
            operation: outcome.kind.to_string(),
            name: name.to_string(),
        });
    }
    println!("Kernel {} of {} finished", outcome.kind, name);
    Ok(())
}

async fn list_devices(
    settings: &BackendSettings,
    kind: HwKind,
    json: bool,
) -> control_panel_backend::Result<()> {
    let paths = settings.hardware.clone();
    let service = tokio::task::spawn_blocking(move || {
        let mut service = HardwareService::from_paths(paths);
        service.refresh().map(|()| service)
    })
    .await??;

    let devices = service.devices(kind);
    let mut out = io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(devices)?)?;
        return Ok(());
    }

    for device in devices {
        writeln!(
            out,
            "{} {}:{} [{}] {} {}",
            device.sysfs_bus_id,
            device.vendor_id,
            device.device_id,
            device.class_id,
            device.vendor_name,
            device.device_name
        )?;
        if !device.available_configs.is_empty() {
            writeln!(out, "    available: {}", device.available_configs.join(", "))?;
        }
        if !device.installed_configs.is_empty() {
            writeln!(out, "    installed: {}", device.installed_configs.join(", "))?;
        }
    }
    Ok(())
}

async fn list_language_packs(json: bool) -> control_panel_backend::Result<()> {
    let packs = tokio::task::spawn_blocking(detect_language_packs).await??;

    let mut out = io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&packs)?)?;
        return Ok(());
    }

    for pack in &packs {
        let state = if pack.parent_packages_installed.is_empty() {
            "not used"
        } else if pack.installed.is_empty() {
            "missing"
        } else {
            "installed"
        };
        writeln!(out, "{:<24} {:<22} {}", pack.name, pack.pkg, state)?;
        if !pack.installed.is_empty() {
            writeln!(out, "    installed: {}", pack.installed.join(", "))?;
        }
        if !pack.parent_packages_installed.is_empty() {
            writeln!(out, "    available: {}", pack.available.len())?;
        }
    }
    Ok(())
}
