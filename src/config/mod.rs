//! Configuration module.
//!
//! # Module Structure
//!
//! - `pacman`: reads the fixed pacman configuration used to open the catalog
//! - `settings`: backend settings (logging, privilege helper, hardware paths)
//!
//! The catalog configuration has no override: it is always read from
//! [`PACMAN_CONFIG_PATH`].

pub mod pacman;
pub mod settings;

pub use pacman::{load_pacman_config, parse_pacman_config, PacmanConfig, PACMAN_CONFIG_PATH};
pub use settings::{get_settings_path, load_settings, save_settings, BackendSettings, HardwarePaths};
