//! Engine configuration loaded from TOML.
//!
//! A configuration names the modules available to a run, the services to
//! attach, and the executions whose scenarios may need bundling for cloud
//! provisioning:
//!
//! ```toml
//! provisioning = "local"
//!
//! [settings]
//! artifacts-dir = "artifacts"
//! file-search-paths = ["."]
//!
//! [modules]
//! custom = "loadkit.services.Unpacker"
//!
//! [module-settings.mobile-env]
//! sdk-path = "/opt/android"
//!
//! [[execution]]
//! executor = "selenium"
//! scenario = { script = "tests/java_package" }
//!
//! [[services]]
//! module = "unpacker"
//! files = ["java_package.zip"]
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use loadkit_services::registry::{ModuleSpec, ModuleTable, builtin_modules};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Provisioning used when the configuration does not choose one.
pub const DEFAULT_PROVISIONING: &str = "local";

/// Provisioning that runs the test on remote workers.
pub const CLOUD_PROVISIONING: &str = "cloud";

/// Errors raised while reading or writing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Read {
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid configuration TOML.
    #[error("invalid configuration {path}: {source}")]
    Parse {
        /// Path that was parsed.
        path: Utf8PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// The configuration could not be serialised.
    #[error("failed to serialise configuration: {0}")]
    Serialise(#[from] toml::ser::Error),

    /// The serialised configuration could not be written.
    #[error("failed to write configuration {path}: {source}")]
    Write {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Where the run executes: `local` or `cloud`.
    pub provisioning: String,
    /// Engine-wide settings.
    pub settings: EngineSettings,
    /// Alias to module reference, merged over the built-in aliases.
    pub modules: BTreeMap<String, String>,
    /// Default settings per module alias.
    pub module_settings: BTreeMap<String, toml::Table>,
    /// Load executions; only their scenario scripts matter here.
    pub execution: Vec<Execution>,
    /// Services attached to the run, in start order.
    pub services: Vec<ServiceConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provisioning: DEFAULT_PROVISIONING.to_owned(),
            settings: EngineSettings::default(),
            modules: BTreeMap::new(),
            module_settings: BTreeMap::new(),
            execution: Vec::new(),
            services: Vec::new(),
        }
    }
}

/// The `[settings]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct EngineSettings {
    /// Directory receiving generated files and tool logs.
    pub artifacts_dir: Utf8PathBuf,
    /// Directories searched, in order, when resolving declared files.
    pub file_search_paths: Vec<PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            artifacts_dir: Utf8PathBuf::from("artifacts"),
            file_search_paths: Vec::new(),
        }
    }
}

/// One `[[execution]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// The scenario this execution runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Scenario>,
    /// Executor-specific keys, passed through untouched.
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// A scenario definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Script file or directory the scenario runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Remaining scenario keys.
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// One `[[services]]` entry: an alias plus settings for this attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceConfig {
    /// Module alias to instantiate.
    pub module: String,
    /// Provisioning this service runs under; `local` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<String>,
    /// Settings layered over the alias's module settings.
    #[serde(flatten)]
    pub settings: toml::Table,
}

impl ServiceConfig {
    /// Creates an entry for `module` with no settings.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            run_at: None,
            settings: toml::Table::new(),
        }
    }
}

impl EngineConfig {
    /// Parses configuration text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error for malformed text or unknown top-level keys.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads and parses the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Writes the configuration as TOML to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialise`] or [`ConfigError::Write`].
    pub fn dump(&self, path: &Utf8Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_owned(),
            source,
        })
    }

    /// Returns `true` when the run is provisioned in the cloud.
    #[must_use]
    pub fn is_cloud(&self) -> bool {
        self.provisioning.trim() == CLOUD_PROVISIONING
    }

    /// Builds the module table: built-in aliases, then configured aliases,
    /// then per-alias settings.
    ///
    /// Settings for an alias that names no module are ignored with a warning.
    #[must_use]
    pub fn module_table(&self) -> ModuleTable {
        let mut modules = builtin_modules();
        for (alias, reference) in &self.modules {
            modules.insert(alias.clone(), ModuleSpec::new(reference.clone()));
        }
        for (alias, settings) in &self.module_settings {
            match modules.get_mut(alias) {
                Some(spec) => spec.settings.extend(settings.clone()),
                None => warn!("settings given for unknown module alias {alias}"),
            }
        }
        modules
    }

    /// Replaces the configured services with a single install checker
    /// running under the current provisioning.
    pub fn install_check_only(&mut self) {
        let mut checker = ServiceConfig::new("install-checker");
        checker.run_at = Some(self.provisioning.clone());
        self.services = vec![checker];
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
