//! Registry mapping module references to component factories.
//!
//! Configuration names components by dotted reference
//! (`loadkit.services.Unpacker`) under a user-chosen alias. The registry
//! resolves a reference to the factory that builds the component, with
//! malformed or unknown references reported as typed configuration errors.

use crate::archive::Unpacker;
use crate::error::{Result, ServiceError};
use crate::install_checker::InstallChecker;
use crate::mobile::MobileEnvLoader;
use crate::service::Service;
use loadkit_common::ModuleRef;
use std::collections::BTreeMap;

/// Reference of the built-in archive unpacker.
pub const UNPACKER: &str = "loadkit.services.Unpacker";
/// Reference of the built-in install checker.
pub const INSTALL_CHECKER: &str = "loadkit.services.InstallChecker";
/// Reference of the built-in mobile environment loader.
pub const MOBILE_ENV_LOADER: &str = "loadkit.services.MobileEnvLoader";

/// Builds a component from its alias and settings table.
pub type ModuleFactory = fn(alias: &str, settings: &toml::Table) -> Result<Box<dyn Service>>;

/// A configured module: its reference plus default settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleSpec {
    /// Dotted component reference.
    pub reference: String,
    /// Settings applied whenever this alias is instantiated.
    pub settings: toml::Table,
}

impl ModuleSpec {
    /// Creates a spec with empty settings.
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            settings: toml::Table::new(),
        }
    }
}

/// Configured modules keyed by alias.
pub type ModuleTable = BTreeMap<String, ModuleSpec>;

/// Default aliases for the built-in components.
#[must_use]
pub fn builtin_modules() -> ModuleTable {
    [
        ("unpacker", UNPACKER),
        ("install-checker", INSTALL_CHECKER),
        ("mobile-env", MOBILE_ENV_LOADER),
        ("appium-loader", MOBILE_ENV_LOADER),
    ]
    .into_iter()
    .map(|(alias, reference)| (alias.to_owned(), ModuleSpec::new(reference)))
    .collect()
}

/// Known component factories keyed by normalised reference.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    factories: BTreeMap<String, ModuleFactory>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in services.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(UNPACKER, Unpacker::factory);
        registry.register(INSTALL_CHECKER, InstallChecker::factory);
        registry.register(MOBILE_ENV_LOADER, MobileEnvLoader::factory);
        registry
    }

    /// Adds or replaces the factory for `reference`.
    pub fn register(&mut self, reference: impl Into<String>, factory: ModuleFactory) {
        let reference = reference.into();
        self.factories.insert(reference.trim().to_owned(), factory);
    }

    /// Returns `true` when `reference` has a factory.
    #[must_use]
    pub fn contains(&self, reference: &str) -> bool {
        self.factories.contains_key(reference.trim())
    }

    /// Registered references in sorted order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Resolves `spec.reference` and builds the component for `alias`.
    ///
    /// `extra` settings are layered over the spec's own settings.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidModuleReference`] when the reference is
    /// malformed, [`ServiceError::UnknownModule`] when nothing is registered
    /// under it, and whatever the factory returns for bad settings.
    pub fn instantiate(
        &self,
        alias: &str,
        spec: &ModuleSpec,
        extra: &toml::Table,
    ) -> Result<Box<dyn Service>> {
        let reference = ModuleRef::parse(&spec.reference).map_err(|source| {
            ServiceError::InvalidModuleReference {
                alias: alias.to_owned(),
                source,
            }
        })?;
        let key = reference.to_string();
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| ServiceError::UnknownModule {
                alias: alias.to_owned(),
                reference: key.clone(),
            })?;

        let mut settings = spec.settings.clone();
        settings.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        factory(alias, &settings)
    }

    /// Looks `alias` up in `modules` and builds it.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::UnknownAlias`] when `alias` is not configured,
    /// plus anything [`ModuleRegistry::instantiate`] returns.
    pub fn instantiate_alias(
        &self,
        modules: &ModuleTable,
        alias: &str,
        extra: &toml::Table,
    ) -> Result<Box<dyn Service>> {
        let spec = modules
            .get(alias)
            .ok_or_else(|| ServiceError::UnknownAlias {
                alias: alias.to_owned(),
            })?;
        self.instantiate(alias, spec, extra)
    }
}
