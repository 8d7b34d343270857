//! Language pack detection.
//!
//! Each definition names an application (or dictionary family) and the
//! pattern of its localization packages, e.g. `firefox-i18n-%`. The pattern
//! matches by prefix up to the first `%`. For every definition the module
//! reports which parent packages are installed and which localization
//! packages are installed or available in the repositories.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::catalog::pacman::parse_sync_listing;
use crate::error::{CatalogError, ConfigError};
use crate::system::command::{display_command, run_captured};

/// Built-in language pack definitions.
const DEFINITIONS_JSON: &str = include_str!("language-packages.json");

/// Marker that ends the literal prefix of a localization package pattern.
pub const PATTERN_WILDCARD: char = '%';

static DEFINITIONS: Lazy<Result<Vec<LanguagePackDefinition>, String>> =
    Lazy::new(|| parse_definitions(DEFINITIONS_JSON).map_err(|e| e.to_string()));

/// One entry of the definitions file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LanguagePackDefinition {
    pub name: String,
    #[serde(rename = "l10n_package")]
    pub pattern: String,
    #[serde(rename = "parent_packages", default)]
    pub parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    #[serde(rename = "Packages")]
    packages: Vec<LanguagePackDefinition>,
}

/// Detected state of one language pack family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguagePackage {
    pub name: String,
    /// Localization package pattern, `%` included
    pub pkg: String,
    pub parent_packages: Vec<String>,
    pub parent_packages_installed: Vec<String>,
    pub installed: Vec<String>,
    pub available: Vec<String>,
}

/// Parse a definitions document (`{"Packages": [...]}`).
pub fn parse_definitions(json: &str) -> Result<Vec<LanguagePackDefinition>, ConfigError> {
    let file: DefinitionsFile = serde_json::from_str(json)?;
    for definition in &file.packages {
        if definition.name.trim().is_empty() || definition.pattern.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(format!(
                "Language pack definition needs a name and a package pattern: {:?}",
                definition
            )));
        }
    }
    Ok(file.packages)
}

/// The built-in definitions, parsed once.
pub fn builtin_definitions() -> Result<&'static [LanguagePackDefinition], ConfigError> {
    match &*DEFINITIONS {
        Ok(definitions) => Ok(definitions.as_slice()),
        Err(e) => Err(ConfigError::ValidationFailed(format!("Built-in language packs: {}", e))),
    }
}

/// Entries of `packages` that are also in `wanted`, in `packages` order.
pub fn intersect(wanted: &[String], packages: &[String]) -> Vec<String> {
    let wanted: HashSet<&str> = wanted.iter().map(String::as_str).collect();
    packages
        .iter()
        .filter(|p| wanted.contains(p.as_str()))
        .cloned()
        .collect()
}

/// Packages whose name starts with the literal part of `pattern`.
pub fn filter_packages(pattern: &str, packages: &[String]) -> Vec<String> {
    let prefix = match pattern.find(PATTERN_WILDCARD) {
        Some(pos) => &pattern[..pos],
        None => pattern,
    };
    packages
        .iter()
        .filter(|p| p.starts_with(prefix))
        .cloned()
        .collect()
}

/// Combine definitions with the installed and repository package lists.
pub fn build_language_packs(
    definitions: &[LanguagePackDefinition],
    installed: &[String],
    available: &[String],
) -> Vec<LanguagePackage> {
    definitions
        .iter()
        .map(|definition| LanguagePackage {
            name: definition.name.clone(),
            pkg: definition.pattern.clone(),
            parent_packages: definition.parents.clone(),
            parent_packages_installed: intersect(&definition.parents, installed),
            installed: filter_packages(&definition.pattern, installed),
            available: filter_packages(&definition.pattern, available),
        })
        .collect()
}

/// Names from `pacman -Qq` output.
pub fn parse_installed_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn pacman_query(args: &[&str]) -> Result<String, CatalogError> {
    let line = display_command("pacman", args);
    let output = run_captured("pacman", args).map_err(|e| CatalogError::Command {
        cmd: line.clone(),
        reason: e.to_string(),
    })?;
    if !output.success() {
        crate::log_command_failure!("Language", line, output);
        return Err(CatalogError::Command {
            cmd: line,
            reason: output.stderr.trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Query pacman and report every built-in language pack family.
///
/// Blocking: runs `pacman -Qq` and `pacman -Sl`.
pub fn detect_language_packs() -> Result<Vec<LanguagePackage>, CatalogError> {
    let definitions = builtin_definitions()?;

    let installed = parse_installed_names(&pacman_query(&["-Qq"])?);
    let available: Vec<String> = parse_sync_listing(&pacman_query(&["-Sl"])?)
        .into_iter()
        .map(|package| package.name)
        .collect();

    log::info!(
        "[Language] {} definitions checked against {} installed and {} repository packages",
        definitions.len(),
        installed.len(),
        available.len()
    );
    Ok(build_language_packs(definitions, &installed, &available))
}
