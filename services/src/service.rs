//! The service lifecycle contract and the context services run in.
//!
//! A service is a pluggable component attached to a test run. The engine
//! calls [`Service::prepare`] and [`Service::startup`] on every active
//! service, then [`Service::shutdown`] and [`Service::post_process`] in
//! reverse order whether or not the earlier steps succeeded.

use crate::error::{Result, ServiceError};
use crate::registry::{ModuleRegistry, ModuleTable};
use loadkit_common::ArtifactsDir;
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Provisioning used when a service does not declare `run-at`.
pub const DEFAULT_RUN_AT: &str = "local";

/// Engine state shared with services during a run.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    /// Directory receiving this run's generated files.
    pub artifacts: &'a ArtifactsDir,
    /// Directories searched when resolving declared file names.
    pub file_search_paths: &'a [PathBuf],
    /// Where the run executes (`local` or `cloud`).
    pub provisioning: &'a str,
    /// Configured modules keyed by alias.
    pub modules: &'a ModuleTable,
    /// Factories for every known component.
    pub registry: &'a ModuleRegistry,
}

/// A pluggable component with a run lifecycle.
///
/// Only [`Service::prepare`] is mandatory; the remaining steps default to
/// doing nothing. `shutdown` and `post_process` must be safe to call even if
/// `startup` never ran, and safe to call twice.
pub trait Service {
    /// The alias this service was configured under.
    fn alias(&self) -> &str;

    /// Validates settings and performs one-off setup before the run.
    ///
    /// # Errors
    ///
    /// Returns a configuration or tool error when the service cannot run.
    fn prepare(&mut self, ctx: &ServiceContext<'_>) -> Result<()>;

    /// Starts long-running resources.
    ///
    /// # Errors
    ///
    /// Returns an error when a resource fails to start.
    fn startup(&mut self, _ctx: &ServiceContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Verifies that the external tools this service needs are usable here.
    ///
    /// # Errors
    ///
    /// Returns a tool or configuration error when a tool is unusable, or
    /// [`ServiceError::NormalShutdown`] when the service should simply not
    /// run in this environment.
    fn check_tools(&self) -> Result<()> {
        Ok(())
    }

    /// Stops whatever `startup` started.
    ///
    /// # Errors
    ///
    /// Returns an error when a resource cannot be released.
    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Final cleanup after the run.
    ///
    /// # Errors
    ///
    /// Returns an error when cleanup fails.
    fn post_process(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Decides whether a service configured with `run_at` runs under
/// `provisioning`.
///
/// Services without `run-at` only run locally, so packing for the cloud
/// does not also trigger worker-side services on the submitting machine.
///
/// # Examples
///
/// ```
/// use loadkit_services::service::should_run;
///
/// assert!(!should_run(None, "cloud"));
/// assert!(should_run(Some("cloud"), "cloud"));
/// assert!(should_run(None, "local"));
/// ```
#[must_use]
pub fn should_run(run_at: Option<&str>, provisioning: &str) -> bool {
    run_at.unwrap_or(DEFAULT_RUN_AT) == provisioning
}

/// Deserialises a service's settings table into its typed settings.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidSettings`] naming `alias` when the table
/// does not match `T`.
pub fn parse_settings<T>(alias: &str, settings: &toml::Table) -> Result<T>
where
    T: DeserializeOwned,
{
    toml::Value::Table(settings.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ServiceError::InvalidSettings {
            alias: alias.to_owned(),
            reason: e.message().to_owned(),
        })
}
