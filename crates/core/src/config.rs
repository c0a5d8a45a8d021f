//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Binaries read environment variables and files; the workflow only
//! ever sees a validated [`CoreConfig`].

use crate::constants::DEFAULT_SPECIALTIES;
use crate::{DischargeError, DischargeResult};
use discharge_types::Specialty;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    specialties: Vec<Specialty>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`DischargeError::InvalidConfig`] if the specialty list is empty or names the same
    /// specialty twice.
    pub fn new(specialties: Vec<Specialty>) -> DischargeResult<Self> {
        if specialties.is_empty() {
            return Err(DischargeError::InvalidConfig(
                "at least one specialty must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for specialty in &specialties {
            if !seen.insert(specialty.as_str()) {
                return Err(DischargeError::InvalidConfig(format!(
                    "specialty listed more than once: {specialty}"
                )));
            }
        }

        Ok(Self { specialties })
    }

    /// Specialties reported by the daily statistics, in display order.
    pub fn specialties(&self) -> &[Specialty] {
        &self.specialties
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            specialties: default_specialties(),
        }
    }
}

/// The built-in specialty list.
pub fn default_specialties() -> Vec<Specialty> {
    DEFAULT_SPECIALTIES
        .iter()
        .filter_map(|name| Specialty::new(name).ok())
        .collect()
}

#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct SpecialtiesFile {
    specialties: Vec<Specialty>,
}

/// Parse a specialties YAML document of the form `specialties: [..]`.
///
/// This uses `serde_path_to_error` so a bad entry is reported with its position, for example
/// `specialties[2]: Text cannot be empty`.
pub fn specialties_from_yaml(yaml_text: &str) -> DischargeResult<Vec<Specialty>> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);

    match serde_path_to_error::deserialize::<_, SpecialtiesFile>(deserializer) {
        Ok(parsed) => Ok(parsed.specialties),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            Err(DischargeError::ConfigYaml(format!("{path}: {source}")))
        }
    }
}

/// Parse a comma-separated specialty list, as given in `DISCHARGE_SPECIALTIES`.
///
/// Returns `None` when the value is absent or blank. Blank entries between commas are skipped.
pub fn specialties_from_env_value(value: Option<String>) -> Option<Vec<Specialty>> {
    let value = value.filter(|v| !v.trim().is_empty())?;

    let specialties: Vec<Specialty> = value
        .split(',')
        .filter_map(|name| Specialty::new(name).ok())
        .collect();

    if specialties.is_empty() {
        None
    } else {
        Some(specialties)
    }
}

/// Resolve the specialty list without reading environment variables.
///
/// A YAML file takes precedence over a comma-separated list, which takes precedence over the
/// built-in defaults.
pub fn resolve_specialties(
    file: Option<PathBuf>,
    list: Option<String>,
) -> DischargeResult<Vec<Specialty>> {
    if let Some(path) = file {
        return read_specialties_file(&path);
    }

    if let Some(specialties) = specialties_from_env_value(list) {
        return Ok(specialties);
    }

    Ok(default_specialties())
}

fn read_specialties_file(path: &Path) -> DischargeResult<Vec<Specialty>> {
    let text = std::fs::read_to_string(path).map_err(DischargeError::ConfigRead)?;
    specialties_from_yaml(&text)
}
